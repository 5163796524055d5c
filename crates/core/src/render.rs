//! Rendering boundary
//!
//! A renderer turns a chart plus override values into a map from output
//! name (`<chart route>/templates/<file>`) to rendered text. Template
//! evaluation itself is delegated: `HelmRenderer` shells out to
//! `helm template`, `RawRenderer` emits templates verbatim for charts whose
//! templates are plain manifests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use tracing::debug;
use walkdir::WalkDir;

use crate::chart::{Chart, Template, CHARTS_DIR, CHART_FILE, TEMPLATES_DIR, VALUES_FILE};
use crate::error::{Error, Result};

const SOURCE_MARKER: &str = "# Source: ";

/// Release information exposed to templates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseContext {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub is_install: bool,
    pub is_upgrade: bool,
    pub time: DateTime<Utc>,
}

impl Default for ReleaseContext {
    fn default() -> Self {
        Self {
            name: "RELEASE-NAME".to_string(),
            namespace: "NAMESPACE".to_string(),
            revision: 0,
            is_install: true,
            is_upgrade: false,
            time: Utc::now(),
        }
    }
}

/// Release overrides declared on a test job
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub revision: Option<u32>,
    #[serde(default, alias = "isupgrade")]
    pub is_upgrade: bool,
}

impl ReleaseContext {
    pub fn from_overrides(overrides: &ReleaseOverrides) -> Self {
        let mut release = Self::default();
        if let Some(name) = overrides.name.as_ref().filter(|n| !n.is_empty()) {
            release.name = name.clone();
        }
        if let Some(namespace) = overrides.namespace.as_ref().filter(|n| !n.is_empty()) {
            release.namespace = namespace.clone();
        }
        if let Some(revision) = overrides.revision {
            release.revision = revision;
        }
        release.is_upgrade = overrides.is_upgrade;
        release.is_install = !overrides.is_upgrade;
        release
    }
}

pub trait Renderer {
    fn render(
        &self,
        chart: &Chart,
        values: &Mapping,
        release: &ReleaseContext,
    ) -> Result<BTreeMap<String, String>>;
}

impl<F> Renderer for F
where
    F: Fn(&Chart, &Mapping, &ReleaseContext) -> Result<BTreeMap<String, String>>,
{
    fn render(
        &self,
        chart: &Chart,
        values: &Mapping,
        release: &ReleaseContext,
    ) -> Result<BTreeMap<String, String>> {
        self(chart, values, release)
    }
}

/// Output names of every renderable template, mapped to `f(template)`.
fn collect_outputs<F>(chart: &Chart, route: &str, f: &F, outputs: &mut BTreeMap<String, String>)
where
    F: Fn(&Template) -> String,
{
    for template in chart.templates.iter().filter(|t| t.is_renderable()) {
        outputs.insert(format!("{}/{}", route, template.name), f(template));
    }
    for dependency in &chart.dependencies {
        let child_route = format!("{}/{}/{}", route, CHARTS_DIR, dependency.name());
        collect_outputs(dependency, &child_route, f, outputs);
    }
}

/// Emits templates without evaluating them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRenderer;

impl Renderer for RawRenderer {
    fn render(
        &self,
        chart: &Chart,
        _values: &Mapping,
        _release: &ReleaseContext,
    ) -> Result<BTreeMap<String, String>> {
        let mut outputs = BTreeMap::new();
        collect_outputs(chart, chart.name(), &|t: &Template| t.data.clone(), &mut outputs);
        Ok(outputs)
    }
}

/// Renders through the `helm template` command.
#[derive(Debug, Clone)]
pub struct HelmRenderer {
    pub binary: PathBuf,
}

impl Default for HelmRenderer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("helm"),
        }
    }
}

impl HelmRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Write the in-memory chart to `dir`, including non-template files of
    /// the original chart directory.
    fn materialize(chart: &Chart, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        copy_support_files(&chart.root, dir)?;

        fs::write(dir.join(CHART_FILE), serde_yaml::to_string(&chart.metadata)?)?;
        fs::write(dir.join(VALUES_FILE), serde_yaml::to_string(&chart.values)?)?;

        for template in &chart.templates {
            let path = dir.join(&template.name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &template.data)?;
        }

        for dependency in &chart.dependencies {
            Self::materialize(dependency, &dir.join(CHARTS_DIR).join(dependency.name()))?;
        }
        Ok(())
    }
}

fn copy_support_files(root: &Path, dir: &Path) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }

    let walker = WalkDir::new(root).min_depth(1).into_iter().filter_entry(|entry| {
        let top_level = entry.depth() == 1;
        let name = entry.file_name().to_string_lossy();
        !(top_level && matches!(name.as_ref(), TEMPLATES_DIR | CHARTS_DIR | CHART_FILE | VALUES_FILE))
    });

    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let target = dir.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Split `helm template` output into per-source texts.
pub fn split_sources(stdout: &str, outputs: &mut BTreeMap<String, String>) {
    let mut current: Option<String> = None;

    for line in stdout.lines() {
        if let Some(name) = line.strip_prefix(SOURCE_MARKER) {
            let name = name.trim().to_string();
            let text = outputs.entry(name.clone()).or_default();
            if !text.is_empty() {
                text.push_str("---\n");
            }
            current = Some(name);
            continue;
        }
        if line == "---" {
            continue;
        }
        if let Some(text) = current.as_ref().and_then(|name| outputs.get_mut(name)) {
            text.push_str(line);
            text.push('\n');
        }
    }
}

impl Renderer for HelmRenderer {
    fn render(
        &self,
        chart: &Chart,
        values: &Mapping,
        release: &ReleaseContext,
    ) -> Result<BTreeMap<String, String>> {
        let workdir = tempfile::tempdir()?;
        let chart_dir = workdir.path().join(chart.name());
        Self::materialize(chart, &chart_dir)?;

        let values_file = workdir.path().join("override-values.yaml");
        fs::write(&values_file, serde_yaml::to_string(values)?)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("template")
            .arg(&release.name)
            .arg(&chart_dir)
            .arg("--namespace")
            .arg(&release.namespace)
            .arg("--values")
            .arg(&values_file);
        if release.is_upgrade {
            command.arg("--is-upgrade");
        }

        debug!("Running {:?}", command);
        let output = command.output().map_err(|e| {
            Error::Render(format!("failed to run {}: {}", self.binary.display(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Render(format!(
                "helm template failed:\n{}",
                stderr.trim_end()
            )));
        }

        // templates that render nothing are still present
        let mut outputs = BTreeMap::new();
        collect_outputs(chart, chart.name(), &|_: &Template| String::new(), &mut outputs);
        split_sources(&String::from_utf8_lossy(&output.stdout), &mut outputs);
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartMetadata;

    fn template(name: &str, data: &str) -> Template {
        Template {
            name: name.to_string(),
            data: data.to_string(),
        }
    }

    fn chart(name: &str, templates: Vec<Template>, dependencies: Vec<Chart>) -> Chart {
        Chart {
            metadata: ChartMetadata {
                name: name.to_string(),
                version: "0.1.0".to_string(),
                ..Default::default()
            },
            templates,
            values: Mapping::new(),
            dependencies,
            root: PathBuf::new(),
        }
    }

    #[test]
    fn test_raw_renderer_names_outputs_by_route() {
        let child = chart("child", vec![template("templates/svc.yaml", "kind: Service\n")], vec![]);
        let parent = chart(
            "parent",
            vec![
                template("templates/_helpers.tpl", "{{ define }}"),
                template("templates/_partial.yaml", "x: 1\n"),
                template("templates/NOTES.txt", "thanks"),
                template("templates/a.yaml", "kind: A\n"),
            ],
            vec![child],
        );

        let outputs = RawRenderer
            .render(&parent, &Mapping::new(), &ReleaseContext::default())
            .unwrap();
        assert_eq!(
            outputs.keys().collect::<Vec<_>>(),
            vec!["parent/charts/child/templates/svc.yaml", "parent/templates/a.yaml"]
        );
        assert_eq!(outputs["parent/templates/a.yaml"], "kind: A\n");
    }

    #[test]
    fn test_closure_renderer() {
        let renderer = |chart: &Chart,
                        _: &Mapping,
                        release: &ReleaseContext|
         -> Result<BTreeMap<String, String>> {
            Ok(BTreeMap::from([(
                format!("{}/templates/x.yaml", chart.name()),
                format!("name: {}\n", release.name),
            )]))
        };
        let outputs = renderer
            .render(&chart("c", vec![], vec![]), &Mapping::new(), &ReleaseContext::default())
            .unwrap();
        assert_eq!(outputs["c/templates/x.yaml"], "name: RELEASE-NAME\n");
    }

    #[test]
    fn test_split_sources() {
        let stdout = "---\n# Source: p/templates/a.yaml\nkind: A\n---\n# Source: p/templates/a.yaml\nkind: B\n---\n# Source: p/templates/b.yaml\nkind: C\nspec:\n  x: 1\n";
        let mut outputs = BTreeMap::from([("p/templates/empty.yaml".to_string(), String::new())]);
        split_sources(stdout, &mut outputs);

        assert_eq!(outputs["p/templates/a.yaml"], "kind: A\n---\nkind: B\n");
        assert_eq!(outputs["p/templates/b.yaml"], "kind: C\nspec:\n  x: 1\n");
        assert_eq!(outputs["p/templates/empty.yaml"], "");
    }

    #[test]
    fn test_release_overrides() {
        let overrides: ReleaseOverrides =
            serde_yaml::from_str("{name: my-release, revision: 3, isUpgrade: true}").unwrap();
        let release = ReleaseContext::from_overrides(&overrides);
        assert_eq!(release.name, "my-release");
        assert_eq!(release.namespace, "NAMESPACE");
        assert_eq!(release.revision, 3);
        assert!(release.is_upgrade);
        assert!(!release.is_install);

        let defaults = ReleaseContext::from_overrides(&ReleaseOverrides::default());
        assert_eq!(defaults.name, "RELEASE-NAME");
        assert!(defaults.is_install);
    }

    #[test]
    fn test_helm_renderer_missing_binary() {
        let renderer = HelmRenderer::new("/nonexistent/helm-binary");
        let err = renderer
            .render(&chart("c", vec![], vec![]), &Mapping::new(), &ReleaseContext::default())
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_materialize_writes_chart() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("files")).unwrap();
        fs::write(source.path().join("files/conf.ini"), "a=1").unwrap();
        fs::create_dir_all(source.path().join("templates")).unwrap();
        fs::write(source.path().join("templates/stale.yaml"), "stale").unwrap();

        let mut parent = chart("parent", vec![template("templates/a.yaml", "kind: A\n")], vec![
            chart("child", vec![template("templates/b.yaml", "kind: B\n")], vec![]),
        ]);
        parent.root = source.path().to_path_buf();

        let out = tempfile::tempdir().unwrap();
        HelmRenderer::materialize(&parent, out.path()).unwrap();

        assert!(out.path().join("Chart.yaml").is_file());
        assert!(out.path().join("files/conf.ini").is_file());
        assert!(out.path().join("templates/a.yaml").is_file());
        assert!(!out.path().join("templates/stale.yaml").exists());
        assert!(out.path().join("charts/child/templates/b.yaml").is_file());
    }
}

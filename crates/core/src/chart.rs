//! Chart model and directory loader

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub const CHART_FILE: &str = "Chart.yaml";
pub const VALUES_FILE: &str = "values.yaml";
pub const TEMPLATES_DIR: &str = "templates";
pub const CHARTS_DIR: &str = "charts";

/// Contents of `Chart.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
}

/// A template file, named relative to its chart (`templates/x.yaml`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub data: String,
}

impl Template {
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// `.tpl` helper files, always kept in scope
    pub fn is_helper(&self) -> bool {
        self.name.ends_with(".tpl")
    }

    /// Whether rendering this template produces output of its own
    pub fn is_renderable(&self) -> bool {
        let file_name = self.file_name();
        !self.is_helper() && !file_name.starts_with('_') && file_name != "NOTES.txt"
    }

    /// Whether `selector` names this template, either by its path below
    /// `templates/` or by its bare file name.
    pub fn matches(&self, selector: &str) -> bool {
        let relative = self
            .name
            .strip_prefix(TEMPLATES_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.name);
        relative == selector || self.file_name() == selector
    }
}

#[derive(Debug, Clone)]
pub struct Chart {
    pub metadata: ChartMetadata,
    pub templates: Vec<Template>,
    /// Default values from `values.yaml`
    pub values: Mapping,
    pub dependencies: Vec<Chart>,
    /// Directory the chart was loaded from
    pub root: PathBuf,
}

impl Chart {
    /// Load an unpacked chart directory, including unpacked sub-charts.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let load_error = |reason: String| Error::ChartLoad {
            path: dir.to_path_buf(),
            reason,
        };

        if !dir.is_dir() {
            return Err(load_error("not a directory".to_string()));
        }

        let chart_file = dir.join(CHART_FILE);
        if !chart_file.is_file() {
            return Err(load_error(format!("{} file is missing", CHART_FILE)));
        }
        let metadata: ChartMetadata =
            serde_yaml::from_str(&std::fs::read_to_string(&chart_file)?)
                .map_err(|e| load_error(format!("invalid {}: {}", CHART_FILE, e)))?;
        if metadata.name.is_empty() {
            return Err(load_error("chart.metadata.name is required".to_string()));
        }

        let values = load_values(&dir.join(VALUES_FILE)).map_err(load_error)?;
        let templates = load_templates(&dir.join(TEMPLATES_DIR))?;
        let dependencies = load_dependencies(&dir.join(CHARTS_DIR))?;

        debug!(
            "Loaded chart {} ({} templates, {} dependencies) from {}",
            metadata.name,
            templates.len(),
            dependencies.len(),
            dir.display()
        );

        Ok(Self {
            metadata,
            templates,
            values,
            dependencies,
            root: dir.to_path_buf(),
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Walk nested dependencies by chart name.
    pub fn dependency(&self, route: &[String]) -> Option<&Chart> {
        let mut current = self;
        for name in route {
            current = current.dependencies.iter().find(|c| c.name() == name)?;
        }
        Some(current)
    }

    pub fn dependency_mut(&mut self, route: &[String]) -> Option<&mut Chart> {
        let mut current = self;
        for name in route {
            current = current.dependencies.iter_mut().find(|c| c.name() == name)?;
        }
        Some(current)
    }
}

fn load_values(path: &Path) -> std::result::Result<Mapping, String> {
    if !path.is_file() {
        return Ok(Mapping::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    match serde_yaml::from_str(&content) {
        Ok(Value::Mapping(map)) => Ok(map),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(format!("{} must be a mapping", VALUES_FILE)),
        Err(e) => Err(format!("invalid {}: {}", VALUES_FILE, e)),
    }
}

fn load_templates(dir: &Path) -> Result<Vec<Template>> {
    let mut templates = Vec::new();
    if !dir.is_dir() {
        return Ok(templates);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        templates.push(Template {
            name: format!("{}/{}", TEMPLATES_DIR, relative),
            data: std::fs::read_to_string(entry.path())?,
        });
    }

    Ok(templates)
}

fn load_dependencies(dir: &Path) -> Result<Vec<Chart>> {
    let mut dependencies = Vec::new();
    if !dir.is_dir() {
        return Ok(dependencies);
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            dependencies.push(Chart::load(&path)?);
        } else if path.extension().map(|e| e == "tgz").unwrap_or(false) {
            warn!("Skipping packed sub-chart {}", path.display());
        }
    }

    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_chart_with_subchart() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("Chart.yaml"), "apiVersion: v2\nname: parent\nversion: 0.1.0\n");
        write(&root.join("values.yaml"), "replicas: 2\n");
        write(&root.join("templates/deployment.yaml"), "kind: Deployment\n");
        write(&root.join("templates/_helpers.tpl"), "{{/* */}}\n");
        write(&root.join("templates/sub/config.yaml"), "kind: ConfigMap\n");
        write(&root.join("charts/child/Chart.yaml"), "name: child\nversion: 1.0.0\n");
        write(&root.join("charts/child/templates/svc.yaml"), "kind: Service\n");
        write(&root.join("charts/packed-1.0.0.tgz"), "");

        let chart = Chart::load(root).unwrap();
        assert_eq!(chart.name(), "parent");
        assert_eq!(chart.metadata.api_version.as_deref(), Some("v2"));
        assert_eq!(chart.values.get("replicas"), Some(&Value::from(2)));

        let names: Vec<&str> = chart.templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "templates/_helpers.tpl",
                "templates/deployment.yaml",
                "templates/sub/config.yaml",
            ]
        );

        assert_eq!(chart.dependencies.len(), 1);
        let child = chart.dependency(&["child".to_string()]).unwrap();
        assert_eq!(child.templates[0].name, "templates/svc.yaml");
        assert!(chart.dependency(&["nope".to_string()]).is_none());
    }

    #[test]
    fn test_load_requires_chart_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Chart::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ChartLoad { .. }));
        assert!(err.to_string().contains("Chart.yaml file is missing"));
    }

    #[test]
    fn test_load_requires_name() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("Chart.yaml"), "version: 0.1.0\n");
        let err = Chart::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_template_selection() {
        let template = Template {
            name: "templates/sub/config.yaml".to_string(),
            data: String::new(),
        };
        assert!(template.matches("sub/config.yaml"));
        assert!(template.matches("config.yaml"));
        assert!(!template.matches("other.yaml"));
        assert!(template.is_renderable());

        let partial = Template {
            name: "templates/_partial.yaml".to_string(),
            data: String::new(),
        };
        assert!(!partial.is_renderable());
    }
}

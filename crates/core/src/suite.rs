//! Declarative YAML test suites

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;
use tracing::debug;

use crate::chart::{Chart, Template};
use crate::error::{Error, Result};
use crate::job::{JobContext, TestJob};
use crate::render::Renderer;
use crate::results::{SnapshotCounting, TestSuiteResult};
use crate::snapshot::SnapshotCache;
use crate::values::split_chart_routes;

/// A suite file: the templates in scope and the jobs to run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestSuite {
    #[serde(rename = "suite", default)]
    pub name: String,

    /// Templates in scope. The first one is the default assertion target.
    #[serde(default)]
    pub templates: Vec<String>,

    #[serde(default)]
    pub tests: Vec<TestJob>,

    /// File the suite was loaded from
    #[serde(skip)]
    pub definition_file: PathBuf,

    /// Chart the suite belongs to, `parent` or `parent/charts/child`
    #[serde(skip)]
    pub chart_route: String,
}

impl TestSuite {
    /// Parse a suite from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    /// Parse a suite file belonging to the chart at `chart_route`
    pub fn from_file(path: &Path, chart_route: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut suite = Self::from_yaml(&content)?;
        suite.definition_file = path.to_path_buf();
        suite.chart_route = chart_route.to_string();
        Ok(suite)
    }

    fn is_from_root_chart(&self) -> bool {
        !self.chart_route.contains('/')
    }

    /// Copy of `chart` restricted to the templates this suite covers.
    ///
    /// A root chart suite without a template list covers the whole chart.
    /// Otherwise only the listed templates plus `.tpl` helpers are kept;
    /// for a sub-chart suite the filtering applies to the sub-chart and the
    /// root chart keeps only its helpers.
    pub fn prepare_chart(&self, chart: &Chart) -> Result<Chart> {
        let mut prepared = chart.clone();

        if self.is_from_root_chart() {
            if !self.templates.is_empty() {
                prepared.templates = select_templates(&chart.templates, &self.templates)?;
            }
            return Ok(prepared);
        }

        prepared.templates.retain(Template::is_helper);
        let routes = split_chart_routes(&self.chart_route);
        let target = prepared
            .dependency_mut(&routes[1..])
            .ok_or_else(|| Error::DependencyNotFound(self.chart_route.clone()))?;
        target.templates = select_templates(&target.templates, &self.templates)?;
        Ok(prepared)
    }

    /// Run every job in order against `chart`.
    pub fn run(
        &self,
        chart: &Chart,
        renderer: &dyn Renderer,
        cache: &mut SnapshotCache,
    ) -> TestSuiteResult {
        let start = Instant::now();
        let chart_route = if self.chart_route.is_empty() {
            chart.name().to_string()
        } else {
            self.chart_route.clone()
        };

        let mut result = TestSuiteResult {
            display_name: self.name.clone(),
            file_path: self.definition_file.display().to_string(),
            chart_route: chart_route.clone(),
            ..Default::default()
        };

        let prepared = match self.prepare_chart(chart) {
            Ok(prepared) => prepared,
            Err(e) => {
                result.exec_error = Some(e.to_string());
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        debug!("Running suite `{}` ({} tests)", self.name, self.tests.len());
        let context = JobContext {
            chart_route: &chart_route,
            definition_file: &self.definition_file,
            default_template: self.templates.first().map(String::as_str),
        };

        result.tests_result = self
            .tests
            .iter()
            .enumerate()
            .map(|(index, job)| job.run(index, &prepared, renderer, cache, &context))
            .collect();
        result.passed = result.tests_result.iter().all(|job| job.passed);
        result.snapshot = count_snapshots(cache);
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }
}

fn select_templates(templates: &[Template], selectors: &[String]) -> Result<Vec<Template>> {
    let mut selected: Vec<Template> = Vec::with_capacity(selectors.len());

    for selector in selectors {
        let template = templates
            .iter()
            .find(|t| t.matches(selector))
            .ok_or_else(|| Error::TemplateNotFound(selector.clone()))?;
        if !selected.contains(template) {
            selected.push(template.clone());
        }
    }

    let helpers: Vec<Template> = templates
        .iter()
        .filter(|t| t.is_helper() && !selected.contains(t))
        .cloned()
        .collect();
    selected.extend(helpers);
    Ok(selected)
}

fn count_snapshots(cache: &SnapshotCache) -> SnapshotCounting {
    SnapshotCounting {
        total: cache.current_count(),
        passed: cache.current_count() - cache.failed_count(),
        failed: cache.failed_count(),
        created: cache.inserted_count(),
        vanished: cache.vanished_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartMetadata;
    use crate::render::RawRenderer;
    use serde_yaml::Mapping;

    fn chart(name: &str, templates: &[&str], dependencies: Vec<Chart>) -> Chart {
        Chart {
            metadata: ChartMetadata {
                name: name.to_string(),
                ..Default::default()
            },
            templates: templates
                .iter()
                .map(|t| Template {
                    name: format!("templates/{}", t),
                    data: format!("kind: {}\n", t.split('.').next().unwrap_or_default()),
                })
                .collect(),
            values: Mapping::new(),
            dependencies,
            root: PathBuf::new(),
        }
    }

    fn names(chart: &Chart) -> Vec<&str> {
        chart.templates.iter().map(|t| t.name.as_str()).collect()
    }

    fn suite(yaml: &str, route: &str) -> TestSuite {
        let mut suite = TestSuite::from_yaml(yaml).unwrap();
        suite.chart_route = route.to_string();
        suite
    }

    #[test]
    fn test_parse_suite() {
        let yaml = r#"
suite: deployment suite
templates:
  - deployment.yaml
tests:
  - it: should render
    asserts:
      - isKind:
          of: Deployment
  - it: should not be a pod
    asserts:
      - isKind:
          of: Pod
        not: true
"#;
        let suite = TestSuite::from_yaml(yaml).unwrap();
        assert_eq!(suite.name, "deployment suite");
        assert_eq!(suite.templates, vec!["deployment.yaml"]);
        assert_eq!(suite.tests.len(), 2);
        assert!(suite.tests[1].assertions[0].not);
    }

    #[test]
    fn test_parse_rejects_bad_assertion() {
        let yaml = "suite: x\ntests:\n  - it: y\n    asserts:\n      - isKnd: {of: Pod}\n";
        let err = TestSuite::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Assertion type `isKnd` is invalid"));
    }

    #[test]
    fn test_prepare_root_without_templates_keeps_everything() {
        let chart = chart("root", &["_helpers.tpl", "a.yaml", "b.yaml"], vec![]);
        let prepared = suite("suite: s\n", "root").prepare_chart(&chart).unwrap();
        assert_eq!(names(&prepared), names(&chart));
    }

    #[test]
    fn test_prepare_root_with_templates() {
        let chart = chart("root", &["_helpers.tpl", "a.yaml", "b.yaml"], vec![]);
        let prepared = suite("suite: s\ntemplates: [b.yaml]\n", "root")
            .prepare_chart(&chart)
            .unwrap();
        assert_eq!(names(&prepared), vec!["templates/b.yaml", "templates/_helpers.tpl"]);
    }

    #[test]
    fn test_prepare_missing_template() {
        let chart = chart("root", &["a.yaml"], vec![]);
        let err = suite("suite: s\ntemplates: [nope.yaml]\n", "root")
            .prepare_chart(&chart)
            .unwrap_err();
        assert_eq!(err.to_string(), "template file `templates/nope.yaml` not found in chart");
    }

    #[test]
    fn test_prepare_subchart_scope() {
        let child = chart("child", &["_child.tpl", "svc.yaml", "cm.yaml"], vec![]);
        let root = chart("root", &["_helpers.tpl", "a.yaml"], vec![child]);

        let prepared = suite("suite: s\ntemplates: [svc.yaml]\n", "root/charts/child")
            .prepare_chart(&root)
            .unwrap();
        assert_eq!(names(&prepared), vec!["templates/_helpers.tpl"]);
        assert_eq!(
            names(&prepared.dependencies[0]),
            vec!["templates/svc.yaml", "templates/_child.tpl"]
        );

        // never the whole sub-chart by default
        let prepared = suite("suite: s\n", "root/charts/child")
            .prepare_chart(&root)
            .unwrap();
        assert_eq!(names(&prepared.dependencies[0]), vec!["templates/_child.tpl"]);
    }

    #[test]
    fn test_prepare_unknown_subchart() {
        let root = chart("root", &["a.yaml"], vec![]);
        let err = suite("suite: s\n", "root/charts/ghost").prepare_chart(&root).unwrap_err();
        assert!(matches!(err, Error::DependencyNotFound(_)));
    }

    #[test]
    fn test_run_uses_first_template_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart("root", &["Deployment.yaml", "Service.yaml"], vec![]);
        let yaml = r#"
suite: default target
templates: [Service.yaml, Deployment.yaml]
tests:
  - it: defaults to the service
    asserts:
      - isKind: {of: Service}
      - template: Deployment.yaml
        isKind: {of: Deployment}
  - it: fails
    asserts:
      - isKind: {of: Deployment}
"#;
        let mut suite = suite(yaml, "root");
        suite.definition_file = dir.path().join("s_test.yaml");
        let mut cache = SnapshotCache::new(dir.path().join("s.snap"), false);
        let result = suite.run(&chart, &RawRenderer, &mut cache);

        assert!(!result.passed);
        assert!(result.tests_result[0].passed);
        assert!(!result.tests_result[1].passed);
        assert_eq!(result.display_name, "default target");
        assert_eq!(result.chart_route, "root");
    }

    #[test]
    fn test_run_errors_when_template_missing() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart("root", &["a.yaml"], vec![]);
        let suite = suite("suite: s\ntemplates: [b.yaml]\ntests:\n  - it: x\n", "root");
        let mut cache = SnapshotCache::new(dir.path().join("s.snap"), false);
        let result = suite.run(&chart, &RawRenderer, &mut cache);
        assert!(!result.passed);
        assert!(result.tests_result.is_empty());
        assert_eq!(
            result.exec_error.as_deref(),
            Some("template file `templates/b.yaml` not found in chart")
        );
    }

    #[test]
    fn test_run_counts_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart("root", &["a.yaml"], vec![]);
        let yaml = "suite: s\ntemplates: [a.yaml]\ntests:\n  - it: x\n    asserts:\n      - matchSnapshot: {}\n";
        let suite = suite(yaml, "root");
        let mut cache = SnapshotCache::new(dir.path().join("s.snap"), false);
        let result = suite.run(&chart, &RawRenderer, &mut cache);
        assert!(result.passed);
        assert_eq!(
            result.snapshot,
            SnapshotCounting {
                total: 1,
                passed: 1,
                failed: 0,
                created: 1,
                vanished: 0,
            }
        );
    }
}

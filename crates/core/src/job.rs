//! Test jobs: render once, assert many times

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::assertion::Assertion;
use crate::chart::{Chart, TEMPLATES_DIR};
use crate::error::{Error, Result};
use crate::path::ValuePath;
use crate::render::{ReleaseContext, ReleaseOverrides, Renderer};
use crate::results::TestJobResult;
use crate::snapshot::{CompareResult, SnapshotCache, SnapshotComparer};
use crate::values::{assemble_user_values, split_chart_routes, EMPTY_SET_PATH};
use crate::yaml::{parse_documents, Document};

/// One `it` entry of a suite
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestJob {
    #[serde(rename = "it", default)]
    pub name: String,
    /// Value files, relative to the suite file unless absolute
    #[serde(default)]
    pub values: Vec<String>,
    /// Inline overrides in declaration order
    #[serde(default, deserialize_with = "deserialize_set")]
    pub set: Vec<(ValuePath, Value)>,
    #[serde(default)]
    pub release: ReleaseOverrides,
    #[serde(default, rename = "asserts")]
    pub assertions: Vec<Assertion>,
}

fn deserialize_set<'de, D>(deserializer: D) -> std::result::Result<Vec<(ValuePath, Value)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default();
    map.into_iter()
        .map(|(key, value)| {
            let text = key
                .as_str()
                .ok_or_else(|| D::Error::custom("set keys must be strings"))?;
            if text.is_empty() {
                return Err(D::Error::custom(EMPTY_SET_PATH));
            }
            let path = ValuePath::parse(text).map_err(D::Error::custom)?;
            Ok((path, value))
        })
        .collect()
}

/// Where a job runs: chart route, defining file and default template
#[derive(Debug, Clone, Copy)]
pub struct JobContext<'a> {
    /// `parent` or `parent/charts/child`
    pub chart_route: &'a str,
    pub definition_file: &'a Path,
    pub default_template: Option<&'a str>,
}

/// Numbers snapshot assertions of one test in evaluation order, from 1.
pub struct OrderedSnapshotComparer<'a> {
    cache: &'a mut SnapshotCache,
    test: &'a str,
    counter: u32,
}

impl<'a> OrderedSnapshotComparer<'a> {
    pub fn new(cache: &'a mut SnapshotCache, test: &'a str) -> Self {
        Self {
            cache,
            test,
            counter: 0,
        }
    }
}

impl SnapshotComparer for OrderedSnapshotComparer<'_> {
    fn compare_to_snapshot(&mut self, content: &Value) -> CompareResult {
        self.counter += 1;
        self.cache.compare(self.test, self.counter, content)
    }
}

impl TestJob {
    /// Render the chart and run every assertion in order.
    pub fn run(
        &self,
        index: usize,
        chart: &Chart,
        renderer: &dyn Renderer,
        cache: &mut SnapshotCache,
        context: &JobContext<'_>,
    ) -> TestJobResult {
        let start = Instant::now();
        let mut result = TestJobResult {
            display_name: self.name.clone(),
            index,
            ..Default::default()
        };

        match self.render_documents(chart, renderer, context) {
            Ok(rendered) => {
                let mut comparer = OrderedSnapshotComparer::new(cache, &self.name);
                result.assertions_result = self
                    .assertions
                    .iter()
                    .enumerate()
                    .map(|(i, assertion)| {
                        let target = self.resolve_target(assertion, context);
                        assertion.assert(i, target.as_deref(), &rendered, &mut comparer)
                    })
                    .collect();
                result.passed = result.assertions_result.iter().all(|a| a.passed);
            }
            Err(e) => {
                debug!("Test `{}` errored: {}", self.name, e);
                result.exec_error = Some(e.to_string());
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Fully qualified output name the assertion targets.
    pub fn resolve_target(&self, assertion: &Assertion, context: &JobContext<'_>) -> Option<String> {
        let template = assertion.template.as_deref().or(context.default_template)?;
        let qualified_prefix = format!("{}/", context.chart_route);
        if template.starts_with(&qualified_prefix) {
            return Some(template.to_string());
        }
        Some(format!(
            "{}/{}/{}",
            context.chart_route,
            TEMPLATES_DIR,
            template.trim_start_matches("./")
        ))
    }

    fn render_documents(
        &self,
        chart: &Chart,
        renderer: &dyn Renderer,
        context: &JobContext<'_>,
    ) -> Result<BTreeMap<String, Vec<Document>>> {
        let routes = split_chart_routes(context.chart_route);
        let base_dir = context
            .definition_file
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let values = assemble_user_values(&self.values, &self.set, &routes, base_dir)?;
        let release = ReleaseContext::from_overrides(&self.release);

        let outputs = renderer.render(chart, &values, &release)?;
        parse_outputs(outputs)
    }
}

/// Decode YAML outputs; other outputs are ignored.
fn parse_outputs(outputs: BTreeMap<String, String>) -> Result<BTreeMap<String, Vec<Document>>> {
    outputs
        .into_iter()
        .filter(|(name, _)| name.ends_with(".yaml"))
        .map(|(name, text)| {
            let docs = parse_documents(&text).map_err(|e| Error::Manifest {
                file: name.clone(),
                reason: e.to_string(),
            })?;
            Ok((name, docs))
        })
        .collect()
}

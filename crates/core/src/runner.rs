//! Runs the test suites of one or more charts

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::chart::{Chart, CHARTS_DIR};
use crate::error::Result;
use crate::render::Renderer;
use crate::results::{ChartResult, RunResult, TestSuiteResult};
use crate::snapshot::SnapshotCache;
use crate::suite::TestSuite;

/// Default suite file pattern, relative to the chart directory
pub const DEFAULT_TEST_FILES: &str = "tests/*_test.yaml";

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Accept changed snapshots as the new baseline
    pub update_snapshot: bool,
    /// Also run suites found in sub-chart directories
    pub with_subchart: bool,
    /// Glob patterns locating suite files
    pub test_files: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            update_snapshot: false,
            with_subchart: true,
            test_files: vec![DEFAULT_TEST_FILES.to_string()],
        }
    }
}

/// A discovered suite file and the chart route it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteFile {
    pub path: PathBuf,
    pub chart_route: String,
}

pub struct TestRunner {
    config: RunnerConfig,
    renderer: Box<dyn Renderer>,
}

impl TestRunner {
    /// Create a runner with default configuration
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self::with_config(RunnerConfig::default(), renderer)
    }

    pub fn with_config(config: RunnerConfig, renderer: impl Renderer + 'static) -> Self {
        Self {
            config,
            renderer: Box::new(renderer),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every suite of every chart. A chart that fails to load is
    /// reported as errored and the remaining charts still run.
    pub fn run<P: AsRef<Path>>(&self, chart_paths: &[P]) -> RunResult {
        let start = Instant::now();
        let charts_result = chart_paths
            .iter()
            .map(|path| self.run_chart(path.as_ref()))
            .collect();
        RunResult::from_charts(charts_result, start.elapsed().as_millis() as u64)
    }

    /// Run the suites of a single chart directory
    pub fn run_chart(&self, path: &Path) -> ChartResult {
        let start = Instant::now();
        let mut result = ChartResult {
            path: path.display().to_string(),
            ..Default::default()
        };

        let chart = match Chart::load(path) {
            Ok(chart) => chart,
            Err(e) => {
                warn!("✗ {} - {}", path.display(), e);
                result.exec_error = Some(e.to_string());
                return result;
            }
        };
        result.name = chart.name().to_string();

        let suite_files = match self.discover_suites(&chart) {
            Ok(files) => files,
            Err(e) => {
                warn!("✗ {} - {}", path.display(), e);
                result.exec_error = Some(e.to_string());
                return result;
            }
        };

        info!("Running {} suite(s) of chart {}", suite_files.len(), chart.name());
        result.suites_result = suite_files
            .iter()
            .map(|file| self.run_suite_file(&chart, file))
            .collect();
        result.passed = result.suites_result.iter().all(|suite| suite.passed);
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Suite files of `chart` and, when enabled, of its sub-charts.
    pub fn discover_suites(&self, chart: &Chart) -> Result<Vec<SuiteFile>> {
        let mut found = Vec::new();
        self.collect_suites(chart, chart.name(), &mut found)?;
        Ok(found)
    }

    fn collect_suites(&self, chart: &Chart, route: &str, found: &mut Vec<SuiteFile>) -> Result<()> {
        let root = glob::Pattern::escape(&chart.root.to_string_lossy());
        let mut files = BTreeSet::new();

        for pattern in &self.config.test_files {
            let full = if Path::new(pattern).is_absolute() {
                pattern.clone()
            } else {
                format!("{}/{}", root, pattern)
            };

            for entry in glob::glob(&full)? {
                match entry {
                    Ok(path) if path.is_file() => {
                        files.insert(path);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable path: {}", e),
                }
            }
        }

        debug!("Found {} suite file(s) for {}", files.len(), route);
        found.extend(files.into_iter().map(|path| SuiteFile {
            path,
            chart_route: route.to_string(),
        }));

        if self.config.with_subchart {
            for dependency in &chart.dependencies {
                let child_route = format!("{}/{}/{}", route, CHARTS_DIR, dependency.name());
                self.collect_suites(dependency, &child_route, found)?;
            }
        }
        Ok(())
    }

    /// Run one suite file against the root chart.
    fn run_suite_file(&self, chart: &Chart, file: &SuiteFile) -> TestSuiteResult {
        let file_path = file.path.display().to_string();

        let suite = match TestSuite::from_file(&file.path, &file.chart_route) {
            Ok(suite) => suite,
            Err(e) => {
                warn!("✗ {} - {}", file_path, e);
                return TestSuiteResult::errored(&file_path, &file.chart_route, e);
            }
        };

        let mut cache = match SnapshotCache::for_suite(&file.path, self.config.update_snapshot) {
            Ok(cache) => cache,
            Err(e) => return TestSuiteResult::errored(&file_path, &file.chart_route, e),
        };

        let result = suite.run(chart, self.renderer.as_ref(), &mut cache);
        if let Err(e) = cache.store_if_needed() {
            warn!("Failed to write snapshot {}: {}", cache.path().display(), e);
        }
        result
    }

    /// Write run results to a JSON file
    pub fn write_results(&self, results: &RunResult, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(path, json)?;

        info!("Results written to: {}", path.display());
        Ok(())
    }
}

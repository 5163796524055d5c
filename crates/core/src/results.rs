//! Result tree produced by a run
//!
//! `RunResult ⊇ ChartResult ⊇ TestSuiteResult ⊇ TestJobResult ⊇
//! AssertionResult`. A parent passes only when it has no execution error
//! and every child passed. Tallies are computed per level and merged by
//! the caller.

use std::ops::AddAssign;

use serde::Serialize;

use crate::validators::AssertType;

/// Result of one assertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionResult {
    pub index: usize,
    pub assert_type: AssertType,
    pub not: bool,
    pub passed: bool,
    pub fail_info: Vec<String>,
}

/// Result of one test job
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestJobResult {
    pub display_name: String,
    pub index: usize,
    pub passed: bool,
    pub exec_error: Option<String>,
    pub assertions_result: Vec<AssertionResult>,
    pub duration_ms: u64,
}

/// Result of one test suite file
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSuiteResult {
    pub display_name: String,
    pub file_path: String,
    pub chart_route: String,
    pub passed: bool,
    pub exec_error: Option<String>,
    pub tests_result: Vec<TestJobResult>,
    pub snapshot: SnapshotCounting,
    pub duration_ms: u64,
}

impl TestSuiteResult {
    /// A suite that could not be run at all
    pub fn errored(file_path: &str, chart_route: &str, error: impl ToString) -> Self {
        Self {
            file_path: file_path.to_string(),
            chart_route: chart_route.to_string(),
            exec_error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn test_counting(&self) -> UnitCounting {
        let mut counting = UnitCounting::default();
        for job in &self.tests_result {
            counting += UnitCounting::of(job.passed, job.exec_error.is_some());
        }
        counting
    }
}

/// Result of every suite run against one chart
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChartResult {
    pub name: String,
    pub path: String,
    pub passed: bool,
    pub exec_error: Option<String>,
    pub suites_result: Vec<TestSuiteResult>,
    pub duration_ms: u64,
}

impl ChartResult {
    pub fn suite_counting(&self) -> UnitCounting {
        let mut counting = UnitCounting::default();
        for suite in &self.suites_result {
            counting += UnitCounting::of(suite.passed, suite.exec_error.is_some());
        }
        counting
    }

    pub fn test_counting(&self) -> UnitCounting {
        let mut counting = UnitCounting::default();
        for suite in &self.suites_result {
            counting += suite.test_counting();
        }
        counting
    }

    pub fn snapshot_counting(&self) -> SnapshotCounting {
        let mut counting = SnapshotCounting::default();
        for suite in &self.suites_result {
            counting += suite.snapshot.clone();
        }
        counting
    }

    /// Suites with at least one failed snapshot comparison
    pub fn suites_with_failed_snapshots(&self) -> u32 {
        self.suites_result
            .iter()
            .filter(|suite| suite.snapshot.failed > 0)
            .count() as u32
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    pub passed: bool,
    pub charts_result: Vec<ChartResult>,
    pub charts: UnitCounting,
    pub suites: UnitCounting,
    pub tests: UnitCounting,
    pub snapshot: SnapshotCounting,
    pub suites_with_failed_snapshots: u32,
    pub duration_ms: u64,
}

impl RunResult {
    /// Aggregate chart results into run-level tallies
    pub fn from_charts(charts_result: Vec<ChartResult>, duration_ms: u64) -> Self {
        let mut result = Self {
            passed: charts_result.iter().all(|chart| chart.passed),
            duration_ms,
            ..Default::default()
        };

        for chart in &charts_result {
            result.charts += UnitCounting::of(chart.passed, chart.exec_error.is_some());
            result.suites += chart.suite_counting();
            result.tests += chart.test_counting();
            result.snapshot += chart.snapshot_counting();
            result.suites_with_failed_snapshots += chart.suites_with_failed_snapshots();
        }

        result.charts_result = charts_result;
        result
    }
}

/// Pass/fail/error tally for charts, suites or tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitCounting {
    pub passed: u32,
    pub failed: u32,
    pub errored: u32,
}

impl UnitCounting {
    /// Tally of a single unit. An errored unit is not also counted failed.
    pub fn of(passed: bool, errored: bool) -> Self {
        let mut counting = Self::default();
        if errored {
            counting.errored = 1;
        } else if passed {
            counting.passed = 1;
        } else {
            counting.failed = 1;
        }
        counting
    }

    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.errored
    }
}

impl AddAssign for UnitCounting {
    fn add_assign(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.errored += other.errored;
    }
}

/// Snapshot tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotCounting {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub created: u32,
    pub vanished: u32,
}

impl AddAssign for SnapshotCounting {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.created += other.created;
        self.vanished += other.vanished;
    }
}

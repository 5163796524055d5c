//! chartcheck: declarative unit tests for Helm charts
//!
//! This crate provides the assertion engine behind the `chartcheck` CLI:
//! - Parses declarative YAML test suites
//! - Renders charts through a pluggable renderer (`helm template` by default)
//! - Evaluates assertions against the rendered documents
//! - Performs snapshot regression testing with per-suite snapshot files
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TestRunner                           │
//! │    ├── Chart::load(path) -> Chart                           │
//! │    ├── discover_suites(chart) -> [SuiteFile]                │
//! │    └── run_suite_file(chart, file) -> TestSuiteResult       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSuite (YAML)                                           │
//! │    ├── suite, templates                                     │
//! │    └── tests: [TestJob]                                     │
//! │          ├── it, values, set, release                       │
//! │          └── asserts: [Assertion]                           │
//! │                ├── template?, documentIndex?, not?          │
//! │                └── <type>: { params } -> Validator          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Renderer                     SnapshotCache                 │
//! │    ├── HelmRenderer             ├── restore / compare       │
//! │    └── RawRenderer              └── store_if_needed         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertion;
pub mod chart;
pub mod error;
pub mod job;
pub mod path;
pub mod printer;
pub mod render;
pub mod results;
pub mod runner;
pub mod snapshot;
pub mod suite;
pub mod validators;
pub mod values;
pub mod yaml;

pub use assertion::Assertion;
pub use chart::Chart;
pub use error::{Error, Result};
pub use path::ValuePath;
pub use printer::Printer;
pub use render::{HelmRenderer, RawRenderer, ReleaseContext, Renderer};
pub use results::{ChartResult, RunResult, TestSuiteResult};
pub use runner::{RunnerConfig, TestRunner};
pub use snapshot::SnapshotCache;
pub use suite::TestSuite;

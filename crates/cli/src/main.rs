//! chartcheck CLI - Main Entry Point
//!
//! Runs declarative unit tests against one or more Helm charts.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chartcheck_core::runner::DEFAULT_TEST_FILES;
use chartcheck_core::{HelmRenderer, Printer, RawRenderer, RunnerConfig, TestRunner};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::debug;

/// How chart templates are turned into manifests
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum RendererKind {
    /// Run `helm template`
    #[default]
    Helm,
    /// Use template files verbatim
    Raw,
}

/// chartcheck - unit tests for Helm charts
#[derive(Parser)]
#[command(name = "chartcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Chart directories to test
    #[arg(value_name = "CHART", required = true)]
    charts: Vec<PathBuf>,

    /// Glob patterns of suite files, relative to the chart directory
    #[arg(short = 'f', long = "file", value_name = "GLOB")]
    files: Vec<String>,

    /// Update snapshot files instead of failing on changes
    #[arg(short = 'u', long)]
    update_snapshot: bool,

    /// Include suites of sub-charts
    #[arg(short = 's', long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    with_subchart: bool,

    /// Force colored output on or off
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    color: Option<bool>,

    /// Renderer used to evaluate templates
    #[arg(long, value_enum, default_value = "helm")]
    renderer: RendererKind,

    /// Path of the helm binary
    #[arg(long, value_name = "PATH", default_value = "helm")]
    helm_binary: PathBuf,

    /// Write the full results as JSON
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            update_snapshot: self.update_snapshot,
            with_subchart: self.with_subchart,
            test_files: if self.files.is_empty() {
                vec![DEFAULT_TEST_FILES.to_string()]
            } else {
                self.files.clone()
            },
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = cli.runner_config();
    debug!("Runner config: {:?}", config);

    let runner = match cli.renderer {
        RendererKind::Helm => {
            TestRunner::with_config(config, HelmRenderer::new(cli.helm_binary.clone()))
        }
        RendererKind::Raw => TestRunner::with_config(config, RawRenderer),
    };

    let result = runner.run(cli.charts.as_slice());

    let mut printer = Printer::new(io::stdout().lock(), cli.color);
    printer
        .print_run(&result)
        .context("failed to print results")?;

    if let Some(path) = &cli.output {
        runner
            .write_results(&result, path)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
    }

    Ok(result.passed)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["chartcheck", "./chart"]).unwrap();
        assert!(cli.with_subchart);
        assert_eq!(cli.color, None);
        assert!(matches!(cli.renderer, RendererKind::Helm));

        let config = cli.runner_config();
        assert_eq!(config.test_files, vec![DEFAULT_TEST_FILES]);
        assert!(!config.update_snapshot);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "chartcheck",
            "-u",
            "-s",
            "false",
            "--color",
            "-f",
            "tests/a_test.yaml",
            "-f",
            "tests/b_test.yaml",
            "--renderer",
            "raw",
            "a",
            "b",
        ])
        .unwrap();
        assert!(cli.update_snapshot);
        assert!(!cli.with_subchart);
        assert_eq!(cli.color, Some(true));
        assert_eq!(cli.charts.len(), 2);
        assert_eq!(cli.runner_config().test_files.len(), 2);
    }

    #[test]
    fn test_cli_requires_chart() {
        assert!(Cli::try_parse_from(["chartcheck"]).is_err());
    }

    #[test]
    fn test_color_off() {
        let cli = Cli::try_parse_from(["chartcheck", "--color=false", "c"]).unwrap();
        assert_eq!(cli.color, Some(false));
    }
}

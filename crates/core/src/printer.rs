//! Human readable report of a run

use std::io::{self, Write};

use colored::Colorize;

use crate::results::{
    AssertionResult, ChartResult, RunResult, SnapshotCounting, TestJobResult, TestSuiteResult,
    UnitCounting,
};

pub struct Printer<W: Write> {
    writer: W,
}

impl<W: Write> Printer<W> {
    /// `colored` forces color on or off; `None` keeps the terminal default.
    pub fn new(writer: W, colored: Option<bool>) -> Self {
        if let Some(enabled) = colored {
            colored::control::set_override(enabled);
        }
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn println(&mut self, content: &str, indent: usize) -> io::Result<()> {
        writeln!(self.writer, "{}{}", "\t".repeat(indent), content)
    }

    /// Print every chart, then the snapshot summary and the footer.
    pub fn print_run(&mut self, result: &RunResult) -> io::Result<()> {
        for chart in &result.charts_result {
            self.print_chart(chart)?;
        }
        self.print_snapshot_summary(result)?;
        self.print_summary(result)
    }

    pub fn print_chart(&mut self, chart: &ChartResult) -> io::Result<()> {
        if let Some(error) = &chart.exec_error {
            let header = format!("\n### {} {}\n", "Error: ".red(), error);
            return self.println(&header, 0);
        }

        let header = format!("\n### Chart [ {} ] {}\n", chart.name.bold(), chart.path.dimmed());
        self.println(&header, 0)?;
        for suite in &chart.suites_result {
            self.print_suite(suite)?;
        }
        Ok(())
    }

    pub fn print_suite(&mut self, suite: &TestSuiteResult) -> io::Result<()> {
        let label = if suite.passed {
            " PASS ".black().on_green()
        } else {
            " FAIL ".white().on_red()
        };
        let path = match suite.file_path.rsplit_once('/') {
            Some((dir, file)) => format!("{}{}", format!("{}/", dir).dimmed(), file),
            None => suite.file_path.clone(),
        };
        self.println(&format!("{} {}\t{}", label, suite.display_name.bold(), path), 0)?;

        if let Some(error) = &suite.exec_error {
            self.println(&"- Execution Error: ".bold().to_string(), 1)?;
            return self.println(&format!("{}\n", error), 2);
        }

        for job in &suite.tests_result {
            self.print_job(job)?;
        }
        Ok(())
    }

    fn print_job(&mut self, job: &TestJobResult) -> io::Result<()> {
        if job.passed {
            return Ok(());
        }

        if let Some(error) = &job.exec_error {
            self.println(&format!("- {}", job.display_name).bold().to_string(), 1)?;
            return self.println(&format!("{}{}\n", "Error: ".bold(), error), 2);
        }

        self.println(&format!("- {}\n", job.display_name).red().to_string(), 1)?;
        for assertion in &job.assertions_result {
            self.print_assertion(assertion)?;
        }
        Ok(())
    }

    fn print_assertion(&mut self, assertion: &AssertionResult) -> io::Result<()> {
        if assertion.passed {
            return Ok(());
        }

        let title = format!(
            "- asserts[{}]{} `{}` fail\n",
            assertion.index,
            if assertion.not { " NOT" } else { "" },
            assertion.assert_type
        );
        self.println(&title.red().to_string(), 2)?;
        for line in &assertion.fail_info {
            self.println(line, 3)?;
        }
        self.println("", 0)
    }

    fn print_snapshot_summary(&mut self, result: &RunResult) -> io::Result<()> {
        if result.snapshot.failed == 0 {
            return Ok(());
        }

        let summary = format!(
            "\nSnapshot Summary: {} in {} test suite.{}",
            format!("{} snapshot failed", result.snapshot.failed).red(),
            result.suites_with_failed_snapshots,
            " Check changes and use `-u` to update snapshot.".dimmed()
        );
        self.println(&summary, 0)
    }

    fn print_summary(&mut self, result: &RunResult) -> io::Result<()> {
        let summary = format!(
            "\nCharts:      {}\nTest Suites: {}\nTests:       {}\nSnapshot:    {}\nTime:        {:.3}s\n",
            unit_counting(&result.charts),
            unit_counting(&result.suites),
            unit_counting(&result.tests),
            snapshot_counting(&result.snapshot),
            result.duration_ms as f64 / 1000.0
        );
        self.println(&summary, 0)
    }
}

fn unit_counting(counting: &UnitCounting) -> String {
    let mut text = String::new();
    if counting.failed > 0 {
        text.push_str(&format!("{} failed, ", counting.failed).red().to_string());
    }
    if counting.errored > 0 {
        text.push_str(&format!("{} errored, ", counting.errored));
    }
    text.push_str(&format!("{} passed, {} total", counting.passed, counting.total()));
    text
}

fn snapshot_counting(counting: &SnapshotCounting) -> String {
    let mut text = unit_counting(&UnitCounting {
        passed: counting.passed,
        failed: counting.failed,
        errored: 0,
    });
    if counting.created > 0 {
        text.push_str(&format!(", {} created", counting.created));
    }
    if counting.vanished > 0 {
        text.push_str(&format!(", {} vanished", counting.vanished));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::AssertType;

    fn render(result: &RunResult) -> String {
        let mut printer = Printer::new(Vec::new(), Some(false));
        printer.print_run(result).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    fn failing_suite() -> TestSuiteResult {
        TestSuiteResult {
            display_name: "deployment".to_string(),
            file_path: "chart/tests/deployment_test.yaml".to_string(),
            passed: false,
            tests_result: vec![
                TestJobResult {
                    display_name: "passes".to_string(),
                    passed: true,
                    ..Default::default()
                },
                TestJobResult {
                    display_name: "should be a pod".to_string(),
                    index: 1,
                    assertions_result: vec![AssertionResult {
                        index: 0,
                        assert_type: AssertType::IsKind,
                        not: true,
                        passed: false,
                        fail_info: vec!["Expected NOT to be kind:\tPod".to_string()],
                    }],
                    ..Default::default()
                },
                TestJobResult {
                    display_name: "renders".to_string(),
                    index: 2,
                    exec_error: Some("helm template failed".to_string()),
                    ..Default::default()
                },
            ],
            snapshot: SnapshotCounting {
                total: 2,
                passed: 1,
                failed: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_print_failures() {
        let chart = ChartResult {
            name: "chart".to_string(),
            path: "./chart".to_string(),
            suites_result: vec![failing_suite()],
            ..Default::default()
        };
        let output = render(&RunResult::from_charts(vec![chart], 1500));

        assert!(output.contains("### Chart [ chart ] ./chart"));
        assert!(output.contains(" FAIL  deployment\tchart/tests/deployment_test.yaml"));
        assert!(!output.contains("- passes"));
        assert!(output.contains("\t- should be a pod"));
        assert!(output.contains("\t\t- asserts[0] NOT `isKind` fail"));
        assert!(output.contains("\t\t\tExpected NOT to be kind:\tPod"));
        assert!(output.contains("\t- renders\n\t\tError: helm template failed"));
        assert!(output.contains("Snapshot Summary: 1 snapshot failed in 1 test suite."));
        assert!(output.contains("Charts:      1 failed, 0 passed, 1 total"));
        assert!(output.contains("Tests:       1 failed, 1 errored, 1 passed, 3 total"));
        assert!(output.contains("Snapshot:    1 failed, 1 passed, 2 total"));
        assert!(output.contains("Time:        1.500s"));
    }

    #[test]
    fn test_print_errored_chart_and_suite() {
        let charts = vec![
            ChartResult {
                path: "missing".to_string(),
                exec_error: Some("Failed to load chart missing: not a directory".to_string()),
                ..Default::default()
            },
            ChartResult {
                name: "ok".to_string(),
                path: "ok".to_string(),
                suites_result: vec![TestSuiteResult::errored(
                    "ok/tests/bad_test.yaml",
                    "ok",
                    "invalid suite",
                )],
                ..Default::default()
            },
        ];
        let output = render(&RunResult::from_charts(charts, 0));

        assert!(output.contains("### Error:  Failed to load chart missing: not a directory"));
        assert!(output.contains("\t- Execution Error: \n\t\tinvalid suite"));
        assert!(output.contains("Charts:      1 failed, 1 errored, 0 passed, 2 total"));
        assert!(!output.contains("Snapshot Summary"));
    }

    #[test]
    fn test_print_passing_run() {
        let chart = ChartResult {
            name: "chart".to_string(),
            path: "chart".to_string(),
            passed: true,
            suites_result: vec![TestSuiteResult {
                display_name: "all good".to_string(),
                file_path: "tests/a_test.yaml".to_string(),
                passed: true,
                snapshot: SnapshotCounting {
                    total: 1,
                    passed: 1,
                    created: 1,
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };
        let output = render(&RunResult::from_charts(vec![chart], 0));
        assert!(output.contains(" PASS  all good\ttests/a_test.yaml"));
        assert!(output.contains("Test Suites: 1 passed, 1 total"));
        assert!(output.contains("Snapshot:    1 passed, 1 total, 1 created"));
    }
}

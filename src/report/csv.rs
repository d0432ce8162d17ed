//! Spreadsheet output as CSV
//!
//! One block per test: a title row, the labelled aggregate, the per-run
//! details, then the system specs and the captured environment as key/value
//! rows. In append mode new blocks go after the existing ones, separated by a
//! blank line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::bench::AggregateReport;
use crate::error::BenchResult;
use crate::platform::SystemSpecs;

pub const SYSTEM_SPECS_TITLE: &str = "SYSTEM SPECS";
pub const ENVIRONMENT_TITLE: &str = "ENVIRONMENT";

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row: Vec<String> = fields.into_iter().map(|f| escape(f.as_ref())).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Render one test block
pub fn render_sheet(report: &AggregateReport, specs: &SystemSpecs, test_name: &str) -> String {
    let mut out = String::new();
    push_row(&mut out, ["TEST", test_name]);

    let statistics = report.statistics.labelled();
    push_row(&mut out, statistics.iter().map(|(label, _)| *label));
    push_row(&mut out, statistics.iter().map(|(_, value)| value.to_string()));

    if let Some(first) = report.details.first() {
        out.push('\n');
        let header = std::iter::once("RUN").chain(first.metrics.labelled().into_iter().map(|(label, _)| label));
        push_row(&mut out, header);
        for detail in &report.details {
            let values = detail.metrics.labelled().into_iter().map(|(_, value)| value.to_string());
            push_row(&mut out, std::iter::once(detail.run.to_string()).chain(values));
        }
    }

    out.push('\n');
    push_row(&mut out, [SYSTEM_SPECS_TITLE]);
    for (label, value) in specs.labelled() {
        push_row(&mut out, [label, value.as_str()]);
    }

    if !report.environ.is_empty() {
        out.push('\n');
        push_row(&mut out, [ENVIRONMENT_TITLE]);
        for (key, value) in &report.environ {
            push_row(&mut out, [key.as_str(), value.as_str()]);
        }
    }
    out
}

/// Write the block to `path`, after the existing content when `append` is set
pub fn write_sheet(
    path: &Path,
    report: &AggregateReport,
    specs: &SystemSpecs,
    test_name: &str,
    append: bool,
) -> BenchResult<()> {
    let block = render_sheet(report, specs, test_name);
    let existing = append && path.is_file() && std::fs::metadata(path)?.len() > 0;

    let mut file = if append {
        OpenOptions::new().create(true).append(true).open(path)?
    } else {
        OpenOptions::new().create(true).write(true).truncate(true).open(path)?
    };
    if existing {
        file.write_all(b"\n")?;
    }
    file.write_all(block.as_bytes())?;

    info!("Spreadsheet written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::aggregate;
    use crate::monitor::{CpuTimes, Observation, RunSample};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn report(details: bool, environ: Option<BTreeMap<String, String>>) -> AggregateReport {
        let mut samples = Vec::new();
        for index in 0..2 {
            let mut sample = RunSample::new(index);
            sample.record(Observation {
                cpu_percent: 25.0,
                memory_percent: 2.0,
                cpu_times: CpuTimes { user: 1.0, system: 0.5 },
                environ: environ.clone(),
            });
            sample.set_total_duration(1.0);
            samples.push(sample);
        }
        aggregate(samples, 1 << 30, 0.1, details, environ.is_some()).unwrap()
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_render_sheet() {
        let env: BTreeMap<String, String> = [("PATH".to_string(), "/bin:/usr/bin".to_string())].into();
        let specs = SystemSpecs::collect(Duration::ZERO);
        let sheet = render_sheet(&report(true, Some(env)), &specs, "warm");
        let lines: Vec<&str> = sheet.lines().collect();

        assert_eq!(lines[0], "TEST,warm");
        assert!(lines[1].starts_with("RUNS,TRIM%,AVG CPU%"));
        assert!(lines[2].starts_with("2,10%,25.00%"));
        assert!(lines[4].starts_with("RUN,AVG CPU%"));
        assert!(lines[5].starts_with("0,25.00%"));
        assert!(lines[6].starts_with("1,25.00%"));
        assert!(lines.contains(&SYSTEM_SPECS_TITLE));
        assert!(lines.contains(&ENVIRONMENT_TITLE));
        assert!(lines.contains(&"PATH,/bin:/usr/bin"));
    }

    #[test]
    fn test_render_without_details() {
        let specs = SystemSpecs::collect(Duration::ZERO);
        let sheet = render_sheet(&report(false, None), &specs, "cold");
        assert!(!sheet.contains("RUN,"));
        assert!(!sheet.contains(ENVIRONMENT_TITLE));
    }

    #[test]
    fn test_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        let specs = SystemSpecs::collect(Duration::ZERO);

        write_sheet(&path, &report(false, None), &specs, "first", true).unwrap();
        write_sheet(&path, &report(false, None), &specs, "second", true).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("TEST,first\n"));
        assert!(content.contains("\n\nTEST,second\n"));

        write_sheet(&path, &report(false, None), &specs, "third", false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("TEST,third\n"));
        assert!(!content.contains("first"));
    }
}

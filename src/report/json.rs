//! JSON Output

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::bench::AggregateReport;
use crate::error::BenchResult;
use crate::platform::SystemSpecs;

#[derive(Serialize)]
struct JsonEntry<'a> {
    #[serde(flatten)]
    report: &'a AggregateReport,
    envstats: &'a SystemSpecs,
}

/// Serialize the report as `{ "<test name>": { ...statistics, "envstats": {...} } }`
pub fn render_json(report: &AggregateReport, specs: &SystemSpecs, test_name: &str) -> serde_json::Result<String> {
    let mut root = BTreeMap::new();
    root.insert(
        test_name,
        JsonEntry {
            report,
            envstats: specs,
        },
    );
    serde_json::to_string_pretty(&root)
}

pub fn write_json(path: &Path, report: &AggregateReport, specs: &SystemSpecs, test_name: &str) -> BenchResult<()> {
    let content = render_json(report, specs, test_name)?;
    std::fs::write(path, content)?;
    info!("JSON report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::aggregate;
    use crate::monitor::{CpuTimes, Observation, RunSample};
    use std::time::Duration;

    fn report() -> AggregateReport {
        let mut sample = RunSample::new(0);
        for cpu in [10.0, 20.0, 30.0] {
            sample.record(Observation {
                cpu_percent: cpu,
                memory_percent: 1.0,
                cpu_times: CpuTimes { user: 0.3, system: 0.1 },
                environ: None,
            });
        }
        sample.set_total_duration(0.6);
        aggregate(vec![sample], 1 << 30, 0.1, true, false).unwrap()
    }

    #[test]
    fn test_json_shape() {
        let specs = SystemSpecs::collect(Duration::ZERO);
        let content = render_json(&report(), &specs, "warm").unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();

        let entry = &value["warm"];
        assert_eq!(entry["entries"], 1);
        assert_eq!(entry["trim"], 0.1);
        assert_eq!(entry["avg_cpu"], 20.0);
        assert_eq!(entry["total_time"], 0.6);
        assert_eq!(entry["details"].as_array().unwrap().len(), 1);
        assert!(entry["environ"].as_object().unwrap().is_empty());
        assert_eq!(entry["envstats"]["OS"], specs.os.as_str());
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let specs = SystemSpecs::collect(Duration::ZERO);
        write_json(&path, &report(), &specs, "cold").unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value.get("cold").is_some());
    }
}

//! Results dumped through the logger

use tracing::info;

use crate::bench::AggregateReport;

use super::banner;

/// Log the statistics, the per-run details and the captured environment
pub fn log_report(report: &AggregateReport) {
    info!("{}", banner("RESULTS"));
    for (label, value) in report.statistics.labelled() {
        info!("{}: {}", label, value);
    }

    info!("{}", banner("DETAILS"));
    for detail in &report.details {
        let row: Vec<String> = detail
            .metrics
            .labelled()
            .into_iter()
            .map(|(label, value)| format!("{}: {}", label, value))
            .collect();
        info!("Run {}: {}", detail.run, row.join(" | "));
    }
    for (key, value) in &report.environ {
        info!("{}={}", key, value);
    }
}

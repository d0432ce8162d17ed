//! Aggregate report produced at the end of a benchmark

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::format_bytes;

/// Statistics extracted from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Mean CPU usage (percent)
    pub avg_cpu: f64,
    pub trimmed_avg_cpu: f64,
    pub max_cpu: f64,
    #[serde(rename = "max_trimmed_cpu")]
    pub trimmed_max_cpu: f64,
    /// Mean resident memory (bytes)
    pub avg_mem: f64,
    pub trimmed_avg_mem: f64,
    pub max_mem: f64,
    #[serde(rename = "max_trimmed_mem")]
    pub trimmed_max_mem: f64,
    /// User CPU time (seconds)
    #[serde(rename = "user_cput")]
    pub user_cpu_time: f64,
    /// System CPU time (seconds)
    #[serde(rename = "system_cput")]
    pub system_cpu_time: f64,
    /// Wall-clock duration of the run (seconds)
    #[serde(rename = "time")]
    pub duration: f64,
}

/// One row of per-run details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDetail {
    pub run: usize,
    #[serde(flatten)]
    pub metrics: RunMetrics,
}

/// Named statistics across all successfully sampled runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStatistics {
    pub entries: usize,
    /// Trim fraction used for the trimmed statistics
    pub trim: f64,
    pub avg_cpu: f64,
    pub trimmed_avg_cpu: f64,
    pub max_cpu: f64,
    #[serde(rename = "max_trimmed_cpu")]
    pub trimmed_max_cpu: f64,
    pub avg_mem: f64,
    pub trimmed_avg_mem: f64,
    pub max_mem: f64,
    #[serde(rename = "max_trimmed_mem")]
    pub trimmed_max_mem: f64,
    #[serde(rename = "user_cput")]
    pub user_cpu_time: f64,
    #[serde(rename = "system_cput")]
    pub system_cpu_time: f64,
    #[serde(rename = "total_time")]
    pub avg_time: f64,
    pub max_time: f64,
    pub min_time: f64,
    #[serde(rename = "mid_time")]
    pub median_time: f64,
}

/// A value formatted for humans
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Count(usize),
    /// A fraction shown as a percentage
    Fraction(f64),
    Percent(f64),
    Bytes(f64),
    Seconds(f64),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Count(n) => write!(f, "{}", n),
            StatValue::Fraction(v) => write!(f, "{}%", (v * 10_000.0).round() / 100.0),
            StatValue::Percent(v) => write!(f, "{:.2}%", v),
            StatValue::Bytes(v) => write!(f, "{}", format_bytes(v.max(0.0).round() as u64)),
            StatValue::Seconds(v) => write!(f, "{:.2} s", v),
        }
    }
}

pub const RUNS_LABEL: &str = "RUNS";
pub const TRIM_LABEL: &str = "TRIM%";
pub const AVG_CPU_LABEL: &str = "AVG CPU%";
pub const TRIMMED_AVG_CPU_LABEL: &str = "TR.AVG CPU%";
pub const MAX_CPU_LABEL: &str = "MAX CPU%";
pub const TRIMMED_MAX_CPU_LABEL: &str = "TR.MAX CPU%";
pub const AVG_MEM_LABEL: &str = "AVG MEM";
pub const TRIMMED_AVG_MEM_LABEL: &str = "TR.AVG MEM";
pub const MAX_MEM_LABEL: &str = "MAX MEM";
pub const TRIMMED_MAX_MEM_LABEL: &str = "TR.MAX MEM";
pub const USER_CPU_LABEL: &str = "USER CPUt";
pub const SYSTEM_CPU_LABEL: &str = "SYS CPUt";
pub const AVG_TIME_LABEL: &str = "AVG TIME";
pub const MAX_TIME_LABEL: &str = "MAX TIME";
pub const MIN_TIME_LABEL: &str = "MIN TIME";
pub const MEDIAN_TIME_LABEL: &str = "MEDIAN TIME";
pub const TIME_LABEL: &str = "TIME";

impl RunMetrics {
    /// Labelled values in report order
    pub fn labelled(&self) -> Vec<(&'static str, StatValue)> {
        vec![
            (AVG_CPU_LABEL, StatValue::Percent(self.avg_cpu)),
            (TRIMMED_AVG_CPU_LABEL, StatValue::Percent(self.trimmed_avg_cpu)),
            (MAX_CPU_LABEL, StatValue::Percent(self.max_cpu)),
            (TRIMMED_MAX_CPU_LABEL, StatValue::Percent(self.trimmed_max_cpu)),
            (AVG_MEM_LABEL, StatValue::Bytes(self.avg_mem)),
            (TRIMMED_AVG_MEM_LABEL, StatValue::Bytes(self.trimmed_avg_mem)),
            (MAX_MEM_LABEL, StatValue::Bytes(self.max_mem)),
            (TRIMMED_MAX_MEM_LABEL, StatValue::Bytes(self.trimmed_max_mem)),
            (USER_CPU_LABEL, StatValue::Seconds(self.user_cpu_time)),
            (SYSTEM_CPU_LABEL, StatValue::Seconds(self.system_cpu_time)),
            (TIME_LABEL, StatValue::Seconds(self.duration)),
        ]
    }
}

impl ReportStatistics {
    /// Labelled values in report order
    pub fn labelled(&self) -> Vec<(&'static str, StatValue)> {
        vec![
            (RUNS_LABEL, StatValue::Count(self.entries)),
            (TRIM_LABEL, StatValue::Fraction(self.trim)),
            (AVG_CPU_LABEL, StatValue::Percent(self.avg_cpu)),
            (TRIMMED_AVG_CPU_LABEL, StatValue::Percent(self.trimmed_avg_cpu)),
            (MAX_CPU_LABEL, StatValue::Percent(self.max_cpu)),
            (TRIMMED_MAX_CPU_LABEL, StatValue::Percent(self.trimmed_max_cpu)),
            (AVG_MEM_LABEL, StatValue::Bytes(self.avg_mem)),
            (TRIMMED_AVG_MEM_LABEL, StatValue::Bytes(self.trimmed_avg_mem)),
            (MAX_MEM_LABEL, StatValue::Bytes(self.max_mem)),
            (TRIMMED_MAX_MEM_LABEL, StatValue::Bytes(self.trimmed_max_mem)),
            (USER_CPU_LABEL, StatValue::Seconds(self.user_cpu_time)),
            (SYSTEM_CPU_LABEL, StatValue::Seconds(self.system_cpu_time)),
            (AVG_TIME_LABEL, StatValue::Seconds(self.avg_time)),
            (MAX_TIME_LABEL, StatValue::Seconds(self.max_time)),
            (MIN_TIME_LABEL, StatValue::Seconds(self.min_time)),
            (MEDIAN_TIME_LABEL, StatValue::Seconds(self.median_time)),
        ]
    }
}

/// Final output of a benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    #[serde(flatten)]
    pub statistics: ReportStatistics,
    /// Empty unless details were requested
    pub details: Vec<RunDetail>,
    /// Environment of the watched processes merged across runs
    pub environ: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_value_display() {
        assert_eq!(StatValue::Count(3).to_string(), "3");
        assert_eq!(StatValue::Fraction(0.25).to_string(), "25%");
        assert_eq!(StatValue::Fraction(0.07).to_string(), "7%");
        assert_eq!(StatValue::Percent(12.345).to_string(), "12.35%");
        assert_eq!(StatValue::Bytes(1536.0).to_string(), "1.50 KB");
        assert_eq!(StatValue::Seconds(1.0).to_string(), "1.00 s");
    }

    #[test]
    fn test_detail_serializes_flat() {
        let detail = RunDetail {
            run: 2,
            metrics: RunMetrics {
                avg_cpu: 1.0,
                trimmed_avg_cpu: 1.0,
                max_cpu: 1.0,
                trimmed_max_cpu: 1.0,
                avg_mem: 1.0,
                trimmed_avg_mem: 1.0,
                max_mem: 1.0,
                trimmed_max_mem: 1.0,
                user_cpu_time: 0.5,
                system_cpu_time: 0.25,
                duration: 3.0,
            },
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["run"], 2);
        assert_eq!(value["user_cput"], 0.5);
        assert_eq!(value["max_trimmed_mem"], 1.0);
        assert_eq!(value["time"], 3.0);
        assert_eq!(detail.metrics.labelled().len(), 11);
    }
}

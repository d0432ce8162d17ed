//! Host description and cross-platform helpers
//!
//! [`SystemSpecs`] is collected once at startup and travels with the reports
//! so results from different machines can be told apart.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::info;

/// Interval over which CPU usage at startup is measured
pub const STARTUP_CPU_INTERVAL: Duration = Duration::from_secs(1);

/// Snapshot of the host running the benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSpecs {
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "OS VERSION")]
    pub os_version: String,
    #[serde(rename = "OS RELEASE")]
    pub os_release: String,
    #[serde(rename = "OS ARCHITECTURE")]
    pub architecture: String,
    #[serde(rename = "MACHINE TYPE")]
    pub machine: String,
    #[serde(rename = "PHYSICAL CORES")]
    pub physical_cores: usize,
    #[serde(rename = "LOGICAL CORES")]
    pub logical_cores: usize,
    /// Global CPU usage (percent)
    #[serde(rename = "USAGE PERCENTAGE @STARTUP")]
    pub startup_cpu: f32,
    /// Total memory (bytes)
    #[serde(rename = "RAW TOTAL MEMORY")]
    pub raw_total_memory: u64,
    #[serde(rename = "TOTAL MEMORY")]
    pub total_memory: String,
    #[serde(rename = "AVAILABLE MEMORY @STARTUP")]
    pub available_memory: String,
}

impl SystemSpecs {
    /// Collect the specs, measuring the startup CPU usage over `cpu_interval`.
    ///
    /// A zero interval skips the measurement and reports 0.
    pub fn collect(cpu_interval: Duration) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let startup_cpu = if cpu_interval.is_zero() {
            0.0
        } else {
            sys.refresh_cpu();
            thread::sleep(cpu_interval);
            sys.refresh_cpu();
            sys.global_cpu_info().cpu_usage()
        };

        let total = sys.total_memory();
        Self {
            os: os_name().to_string(),
            os_version: System::long_os_version()
                .or_else(System::os_version)
                .unwrap_or_else(|| "unknown".into()),
            os_release: System::kernel_version().unwrap_or_else(|| "unknown".into()),
            architecture: format!("{}bit", usize::BITS),
            machine: std::env::consts::ARCH.to_string(),
            physical_cores: num_cpus::get_physical(),
            logical_cores: num_cpus::get(),
            startup_cpu,
            raw_total_memory: total,
            total_memory: format_bytes(total),
            available_memory: format_bytes(sys.available_memory()),
        }
    }

    /// Labelled values in report order
    pub fn labelled(&self) -> Vec<(&'static str, String)> {
        vec![
            ("OS", self.os.clone()),
            ("OS VERSION", self.os_version.clone()),
            ("OS RELEASE", self.os_release.clone()),
            ("OS ARCHITECTURE", self.architecture.clone()),
            ("MACHINE TYPE", self.machine.clone()),
            ("PHYSICAL CORES", self.physical_cores.to_string()),
            ("LOGICAL CORES", self.logical_cores.to_string()),
            ("USAGE PERCENTAGE @STARTUP", format!("{:.1}", self.startup_cpu)),
            ("RAW TOTAL MEMORY", self.raw_total_memory.to_string()),
            ("TOTAL MEMORY", self.total_memory.clone()),
            ("AVAILABLE MEMORY @STARTUP", self.available_memory.clone()),
        ]
    }

    /// Dump the specs to the log between `SPECS` banners
    pub fn log(&self) {
        info!("{} SPECS {}", "=".repeat(40), "=".repeat(40));
        for (label, value) in self.labelled() {
            info!("{}: {}", label, value);
        }
        info!("{}", "=".repeat(87));
    }
}

/// Operating system family name used in the output tree
pub fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

/// Format bytes into a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
        assert_eq!(format_bytes(1024u64 * 1024 * 1024 * 1024), "1.00 TB");
    }

    #[test]
    fn test_collect_specs() {
        let specs = SystemSpecs::collect(Duration::ZERO);
        assert_eq!(specs.os, os_name());
        assert!(specs.logical_cores >= 1);
        assert!(specs.logical_cores >= specs.physical_cores);
        assert!(specs.raw_total_memory > 0);
        assert_eq!(specs.startup_cpu, 0.0);
        assert_eq!(specs.labelled().len(), 11);
    }

    #[test]
    fn test_specs_serialize_with_labels() {
        let specs = SystemSpecs::collect(Duration::ZERO);
        let value = serde_json::to_value(&specs).unwrap();
        assert_eq!(value["OS"], specs.os.as_str());
        assert_eq!(value["RAW TOTAL MEMORY"], specs.raw_total_memory);
        assert!(value.get("AVAILABLE MEMORY @STARTUP").is_some());
    }
}

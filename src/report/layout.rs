//! Where a benchmark writes its files
//!
//! Everything lands under `<output_dir>/<OS>[_<envname>]/<pname>`:
//! one `.out` file per attempt, the JSON report and the spreadsheet.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// File naming for one benchmark invocation
#[derive(Debug, Clone)]
pub struct OutputLayout {
    folder: PathBuf,
    pname: String,
    stamp: String,
    day: String,
}

impl OutputLayout {
    pub fn new(output_dir: &Path, os: &str, envname: Option<&str>, pname: &str, start: DateTime<Local>) -> Self {
        let platform = match envname {
            Some(env) if !env.is_empty() => format!("{}_{}", os, env),
            _ => os.to_string(),
        };
        Self {
            folder: output_dir.join(sanitize(&platform)).join(sanitize(pname)),
            pname: sanitize(pname),
            stamp: start.format("%y%m%d_%H%M%S").to_string(),
            day: start.format("%y%m%d").to_string(),
        }
    }

    /// Create the folder tree
    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.folder)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Output file receiving stdout and stderr of attempt `index`
    pub fn run_output(&self, index: usize) -> PathBuf {
        self.folder.join(format!("{}.{}.{}.out", self.pname, self.stamp, index))
    }

    pub fn json_report(&self) -> PathBuf {
        self.folder.join(format!("{}.{}.json", self.pname, self.stamp))
    }

    /// Spreadsheet file; one per day in append mode
    pub fn sheet(&self, append: bool) -> PathBuf {
        let stamp = if append { &self.day } else { &self.stamp };
        self.folder.join(format!("{}.{}.csv", self.pname, stamp))
    }
}

/// Name of the test inside the reports
pub fn test_name(testname: Option<&str>, append: bool, start: DateTime<Local>) -> String {
    match testname {
        Some(name) if append => format!("{}_{}", name, start.format("%H%M%S")),
        Some(name) => name.to_string(),
        None => start.format("%y%m%d%H%M%S").to_string(),
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
        .collect()
}

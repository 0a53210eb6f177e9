//! `[output]` section: how reports and progress reach the terminal

use conductor_domain::OutputFormat;
use serde::{Deserialize, Serialize};

pub use conductor_domain::OutputFormat as FileOutputFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Report format when `-o` is not given (summary when unset)
    pub format: Option<OutputFormat>,
    /// ANSI colors in reports and progress lines
    pub color: bool,
    /// Live spinner per orchestration
    pub show_progress: bool,
}

impl FileOutputConfig {
    /// Spinners only make sense for human-readable output, and never in quiet mode.
    pub fn progress_enabled(&self, quiet: bool, format: OutputFormat) -> bool {
        self.show_progress && !quiet && format != OutputFormat::Json
    }
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            show_progress: true,
        }
    }
}

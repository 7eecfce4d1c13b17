//! Output configuration from TOML (`[output]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// "text" or "json"; the command line flag wins when given
    pub format: Option<String>,
    /// Enable colored terminal output
    pub color: bool,
    /// Append a JSONL transcript of every council event to this file
    pub transcript: Option<PathBuf>,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            transcript: None,
        }
    }
}

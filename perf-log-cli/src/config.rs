//! Configuration loading and parsing

use anyhow::{Context, Result};
use perf_log_decoder::AnalysisConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Performance log files, merged in capture order
    #[serde(default)]
    pub logs: Vec<PathBuf>,
    /// ID list file with names, colors and expected frequencies
    pub ids: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Report destination (default: stdout)
    pub output_file: Option<PathBuf>,
    /// Decimal places for times (default: derived from the log clock)
    pub time_precision: Option<usize>,
    #[serde(default)]
    pub include_headers: bool,
    #[serde(default)]
    pub include_events: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            logs = ["cpu1_a.dat", "cpu1_b.dat"]
            ids = "perf_ids.txt"

            [analysis]
            show_gaps = false
            notes_dir = "notes"

            [output]
            format = "json"
            time_precision = 3
            include_events = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.logs.len(), 2);
        assert_eq!(config.input.ids, Some(PathBuf::from("perf_ids.txt")));
        assert!(!config.analysis.show_gaps);
        assert!(config.analysis.sort_ids);
        assert_eq!(config.analysis.notes_dir(), Path::new("notes"));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.time_precision, Some(3));
        assert!(config.output.include_events);
        assert!(!config.output.include_headers);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert!(config.input.logs.is_empty());
        assert!(config.analysis.show_gaps);
        assert_eq!(config.output.format, OutputFormat::Txt);
    }

    #[test]
    fn test_load_config_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "[input]\nlogs = [\"a.dat\"]\n").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.input.logs, vec![PathBuf::from("a.dat")]);

        assert!(load_config(Path::new("/nonexistent/config.toml")).is_err());
    }
}

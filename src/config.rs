//! User configuration (`config.toml`).

use directories::ProjectDirs;
use ratesheet_core::Layout;
use ratesheet_engine::engine::DEFAULT_MAX_DEPTH;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub sheet_name: Option<String>,
    /// Workbook used when no file argument is given
    pub default_workbook: Option<PathBuf>,
    pub log_filter: Option<String>,
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub layout: Layout,
}

impl Config {
    /// Sheet layout with the top-level `sheet_name` applied.
    pub fn layout(&self) -> Layout {
        let mut layout = self.layout.clone();
        if let Some(name) = self.sheet_name.as_ref() {
            layout.sheet_name = name.clone();
        }
        layout
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "ratesheet")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

/// Load the config from `explicit` or the user config dir. Problems are
/// returned as warnings and the defaults are used.
pub fn load_config(explicit: Option<&Path>) -> (Config, Vec<String>) {
    let mut warnings = Vec::new();
    let Some(path) = explicit.map(Path::to_path_buf).or_else(user_config_path) else {
        return (Config::default(), warnings);
    };

    if !path.exists() {
        if explicit.is_some() {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
        return (Config::default(), warnings);
    }

    let config = match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => {
            warnings.push(format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            ));
            None
        }
        Ok(_) => match std::fs::read_to_string(&path) {
            Ok(content) => match parse_config(&content) {
                Ok(config) => Some(config),
                Err(err) => {
                    warnings.push(format!("Failed to parse {}: {}", path.display(), err));
                    None
                }
            },
            Err(err) => {
                warnings.push(format!("Failed to read {}: {}", path.display(), err));
                None
            }
        },
        Err(err) => {
            warnings.push(format!("Failed to read metadata for {}: {}", path.display(), err));
            None
        }
    };

    (config.unwrap_or_default(), warnings)
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_path_is_deterministic() {
        assert_eq!(user_config_path(), user_config_path());
    }

    #[test]
    fn test_parse_overrides() {
        let config = parse_config(
            r#"
sheet_name = "Fees"
max_depth = 16
log_filter = "ratesheet_core=debug"

[layout]
total_cost_label = "Total"
"#,
        )
        .unwrap();
        let layout = config.layout();
        assert_eq!(layout.sheet_name, "Fees");
        assert_eq!(layout.total_cost_label, "Total");
        assert_eq!(layout.from_label, "From");
        assert_eq!(config.max_depth(), 16);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse_config("colour = \"red\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file_warns() {
        let (config, warnings) = load_config(Some(Path::new("/nonexistent/ratesheet.toml")));
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(warnings.len(), 1);
    }
}

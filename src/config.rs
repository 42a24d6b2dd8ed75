use crate::library::{COMPONENTS_DIR, PIPELINES_DIR};
use crate::output::OutputFormat;
use crate::query::executor::EvalOptions;
use crate::query::scorer::ScoringWeights;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "promptkit";
const CONFIG_FILE: &str = "config.json";

/// Environment variable naming the library root
pub const LIBRARY_ENV: &str = "PROMPTKIT_LIBRARY";

/// Default composed output, relative to the library root
pub const DEFAULT_OUTPUT_FILE: &str = "output.md";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Library used when neither `--library` nor the environment names one
    #[serde(default)]
    pub library_root: Option<PathBuf>,

    /// Where `activate` writes; relative paths are taken from the library root
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    #[serde(default)]
    pub default_output: OutputFormat,

    /// `tag:` requires the whole tag instead of a prefix
    #[serde(default)]
    pub exact_tag_match: bool,

    #[serde(default)]
    pub scoring: ScoringWeights,
}

fn default_output_file() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_root: None,
            output_file: default_output_file(),
            default_output: OutputFormat::default(),
            exact_tag_match: false,
            scoring: ScoringWeights::default(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        Ok(config)
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            exact_tags: self.exact_tag_match,
        }
    }

    /// Output file for `activate` under a given library root
    pub fn output_path(&self, library_root: &Path) -> PathBuf {
        if self.output_file.is_absolute() {
            self.output_file.clone()
        } else {
            library_root.join(&self.output_file)
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create {}", app_dir.display()))?;
    Ok(app_dir)
}

/// Pick the library root.
///
/// In order: the explicit flag, `PROMPTKIT_LIBRARY`, the configured root,
/// the nearest ancestor of `cwd` holding `components/` or `pipelines/`, and
/// finally `cwd` itself.
pub fn resolve_library_root(
    flag: Option<&Path>,
    env: Option<&str>,
    config: &AppConfig,
    cwd: &Path,
) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Some(value) = env.filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(value);
    }
    if let Some(path) = &config.library_root {
        return path.clone();
    }
    find_library_root(cwd).unwrap_or_else(|| cwd.to_path_buf())
}

/// Walk up from `start` to the first directory that looks like a library
pub fn find_library_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(COMPONENTS_DIR).is_dir() || dir.join(PIPELINES_DIR).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.library_root.is_none());
        assert_eq!(config.output_file, PathBuf::from("output.md"));
        assert!(!config.exact_tag_match);
        assert_eq!(config.default_output, OutputFormat::Text);
    }

    #[test]
    fn test_app_config_partial_json() {
        // Should use defaults for missing fields
        let json = r#"{"exact_tag_match": true, "scoring": {"tag_exact": 3.0}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert!(config.exact_tag_match);
        assert!(config.eval_options().exact_tags);
        assert_eq!(config.scoring.tag_exact, 3.0);
        assert_eq!(config.scoring.base, 1.0);
        assert_eq!(config.output_file, PathBuf::from("output.md"));
    }

    #[test]
    fn test_app_config_empty_json() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_output, OutputFormat::Text);
        assert_eq!(config.scoring, ScoringWeights::default());
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            library_root: Some(PathBuf::from("/srv/prompts")),
            default_output: OutputFormat::Json,
            ..AppConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.library_root, Some(PathBuf::from("/srv/prompts")));
        assert_eq!(loaded.default_output, OutputFormat::Json);
    }

    #[test]
    fn test_missing_config_file_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded = AppConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.library_root.is_none());
    }

    #[test]
    fn test_output_path() {
        let config = AppConfig::default();
        assert_eq!(
            config.output_path(Path::new("/lib")),
            PathBuf::from("/lib/output.md")
        );
    }

    #[test]
    fn test_resolve_library_root_precedence() {
        let dir = TempDir::new().unwrap();
        let lib = dir.path().join("lib");
        let nested = lib.join("components").join("prompts");
        fs::create_dir_all(&nested).unwrap();

        let mut config = AppConfig::default();
        let flag = PathBuf::from("/flag");

        assert_eq!(
            resolve_library_root(Some(&flag), Some("/env"), &config, &nested),
            flag
        );
        assert_eq!(
            resolve_library_root(None, Some("/env"), &config, &nested),
            PathBuf::from("/env")
        );

        config.library_root = Some(PathBuf::from("/configured"));
        assert_eq!(
            resolve_library_root(None, Some("  "), &config, &nested),
            PathBuf::from("/configured")
        );

        config.library_root = None;
        assert_eq!(resolve_library_root(None, None, &config, &nested), lib);

        let elsewhere = dir.path().join("elsewhere");
        fs::create_dir_all(&elsewhere).unwrap();
        assert_eq!(
            resolve_library_root(None, None, &config, &elsewhere),
            elsewhere
        );
    }
}

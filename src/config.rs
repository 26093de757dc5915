use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::api::{DashboardClient, DEFAULT_BASE_URL};
use crate::catalog::{all_assets, AssetKey};
use crate::duration::{deserialize_duration, deserialize_optional_duration};
use crate::format::{NumberFormatter, DEFAULT_DECIMAL_PLACES};
use crate::history::DEFAULT_MAX_SPAN_MONTHS;
use crate::notify::DEFAULT_DISMISS_AFTER;
use crate::session::{SessionSettings, DEFAULT_SPAN_DAYS};

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "PAINEL_API_URL";

const CONFIG_FILE_NAME: &str = "painel.toml";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Indicators backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,

    /// Give up on requests after this long. Unset means no deadline.
    #[serde(deserialize_with = "deserialize_optional_duration")]
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: None,
        }
    }
}

/// History view defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Length of the initial date range, ending today.
    pub default_span_days: u32,

    /// Assets selected on startup. Unset selects the whole catalog.
    pub default_assets: Option<Vec<String>>,

    /// Longest range accepted, in calendar months.
    pub max_span_months: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_span_days: DEFAULT_SPAN_DAYS,
            default_assets: None,
            max_span_months: DEFAULT_MAX_SPAN_MONTHS,
        }
    }
}

impl HistoryConfig {
    pub fn default_assets(&self) -> Vec<AssetKey> {
        match &self.default_assets {
            Some(keys) => keys
                .iter()
                .map(AssetKey::new)
                .filter(|k| !k.as_str().is_empty())
                .collect(),
            None => all_assets(),
        }
    }
}

fn default_dismiss_after() -> Duration {
    DEFAULT_DISMISS_AFTER
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long a notification stays on screen.
    #[serde(
        default = "default_dismiss_after",
        deserialize_with = "deserialize_duration"
    )]
    pub dismiss_after: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dismiss_after: default_dismiss_after(),
        }
    }
}

/// Number formatting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub decimal_places: u32,

    /// Suffix for index values in points (e.g. "pts"). Unset shows bare numbers.
    pub point_unit: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            decimal_places: DEFAULT_DECIMAL_PLACES,
            point_unit: None,
        }
    }
}

impl DisplayConfig {
    pub fn formatter(&self) -> NumberFormatter {
        NumberFormatter::new(self.decimal_places).with_point_unit(self.point_unit.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Where CSV files are written. If relative, resolved from the config
    /// file location. If not specified, defaults to the config file's directory.
    pub output_dir: Option<PathBuf>,
}

impl ExportConfig {
    pub fn resolve_output_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => config_dir.join(dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub history: HistoryConfig,
    pub notifications: NotificationConfig,
    pub display: DisplayConfig,
    pub export: ExportConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Loaded configuration with resolved paths and overrides applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The file the settings came from, whether or not it exists.
    pub config_path: PathBuf,

    /// The resolved export directory.
    pub export_dir: PathBuf,

    pub api: ApiConfig,
    pub history: HistoryConfig,
    pub notifications: NotificationConfig,
    pub display: DisplayConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./painel.toml` if it exists in current directory
/// 2. `~/.local/share/painel/painel.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("painel").join(CONFIG_FILE_NAME);
    }

    local_config
}

impl ResolvedConfig {
    fn from_config(config: Config, config_path: PathBuf, config_dir: &Path) -> Self {
        let mut resolved = Self {
            export_dir: config.export.resolve_output_dir(config_dir),
            config_path,
            api: config.api,
            history: config.history,
            notifications: config.notifications,
            display: config.display,
        };
        resolved.apply_api_url_override(std::env::var(API_URL_ENV).ok());
        resolved
    }

    /// Load and resolve config from a file path.
    ///
    /// The export directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?
            .to_path_buf();

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_path, &config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?
            .to_path_buf();

        Ok(Self::from_config(Config::default(), config_path, &config_dir))
    }

    /// Replace the configured base URL with a non-blank override.
    pub fn apply_api_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
    }

    pub fn formatter(&self) -> NumberFormatter {
        self.display.formatter()
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            formatter: self.formatter(),
            default_span_days: self.history.default_span_days,
            default_assets: self.history.default_assets(),
            max_span_months: self.history.max_span_months,
            dismiss_after: self.notifications.dismiss_after,
        }
    }

    pub fn client(&self) -> Result<DashboardClient> {
        DashboardClient::with_timeout(&self.api.base_url, self.api.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_export_dir_is_config_dir() {
        let config = ExportConfig::default();
        let config_dir = Path::new("/home/user/painel");
        assert_eq!(
            config.resolve_output_dir(config_dir),
            PathBuf::from("/home/user/painel")
        );
    }

    #[test]
    fn test_relative_and_absolute_export_dir() {
        let config_dir = Path::new("/home/user/painel");

        let relative = ExportConfig {
            output_dir: Some(PathBuf::from("exports")),
        };
        assert_eq!(
            relative.resolve_output_dir(config_dir),
            PathBuf::from("/home/user/painel/exports")
        );

        let absolute = ExportConfig {
            output_dir: Some(PathBuf::from("/tmp/csv")),
        };
        assert_eq!(
            absolute.resolve_output_dir(config_dir),
            PathBuf::from("/tmp/csv")
        );
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("painel.toml");
        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout, None);
        assert_eq!(config.history.default_span_days, 30);
        assert_eq!(config.history.max_span_months, 24);
        assert_eq!(config.history.default_assets(), all_assets());
        assert_eq!(config.notifications.dismiss_after, Duration::from_secs(5));
        assert_eq!(config.display.decimal_places, 2);

        Ok(())
    }

    #[test]
    fn test_load_api_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("painel.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[api]")?;
        writeln!(file, "base_url = \"http://indicadores.local:8080\"")?;
        writeln!(file, "timeout = \"30s\"")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.api.base_url, "http://indicadores.local:8080");
        assert_eq!(config.api.timeout, Some(Duration::from_secs(30)));

        Ok(())
    }

    #[test]
    fn test_load_history_and_notifications() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("painel.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[history]")?;
        writeln!(file, "default_span_days = 90")?;
        writeln!(file, "default_assets = [\"SELIC\", \"dolar\"]")?;
        writeln!(file, "[notifications]")?;
        writeln!(file, "dismiss_after = \"1m\"")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.history.default_span_days, 90);
        assert_eq!(
            config.history.default_assets(),
            vec![AssetKey::new("selic"), AssetKey::new("dolar")]
        );
        assert_eq!(config.notifications.dismiss_after, Duration::from_secs(60));

        Ok(())
    }

    #[test]
    fn test_invalid_duration_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("painel.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[notifications]")?;
        writeln!(file, "dismiss_after = \"soon\"")?;

        assert!(Config::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    fn test_display_formatter_uses_point_unit() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("painel.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[display]")?;
        writeln!(file, "decimal_places = 1")?;
        writeln!(file, "point_unit = \"pts\"")?;

        let config = Config::load(&config_path)?;
        let formatter = config.display.formatter();
        assert_eq!(
            formatter.format(Some(125_000.0), crate::format::ValueKind::Points),
            "125.000,0 pts"
        );

        Ok(())
    }

    #[test]
    fn test_resolved_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("painel.toml");

        let resolved = ResolvedConfig::load_or_default(&config_path)?;
        assert_eq!(resolved.export_dir, dir.path());
        assert_eq!(resolved.config_path, config_path);

        Ok(())
    }

    #[test]
    fn test_resolved_config_resolves_relative_export_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("painel.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[export]")?;
        writeln!(file, "output_dir = \"./csv\"")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        assert_eq!(resolved.export_dir, dir.path().canonicalize()?.join("./csv"));

        Ok(())
    }

    #[test]
    fn test_api_url_override() {
        let mut resolved = ResolvedConfig::from_config(
            Config::default(),
            PathBuf::from("/tmp/painel.toml"),
            Path::new("/tmp"),
        );
        resolved.apply_api_url_override(Some("  ".to_string()));
        assert_ne!(resolved.api.base_url, "  ");

        resolved.apply_api_url_override(Some("http://override:9000".to_string()));
        assert_eq!(resolved.api.base_url, "http://override:9000");
    }

    #[test]
    fn test_session_settings_follow_config() {
        let mut config = Config::default();
        config.history.max_span_months = 12;
        config.notifications.dismiss_after = Duration::from_secs(10);
        let resolved = ResolvedConfig::from_config(
            config,
            PathBuf::from("/tmp/painel.toml"),
            Path::new("/tmp"),
        );

        let settings = resolved.session_settings();
        assert_eq!(settings.max_span_months, 12);
        assert_eq!(settings.dismiss_after, Duration::from_secs(10));
        assert_eq!(settings.default_assets.len(), 10);
    }
}

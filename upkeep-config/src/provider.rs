//! Configuration provider using Figment

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use tracing::{debug, info, trace};

use crate::error::ConfigError;
use crate::types::UpkeepConfig;
use crate::ConfigResult;

/// Directory name searched in the home and working directories.
pub const CONFIG_DIR_NAME: &str = ".upkeep";
/// Base file name; any of `toml`, `yaml`, `yml`, `json` is accepted.
pub const CONFIG_FILE_STEM: &str = "upkeep";
/// Environment prefix; `__` separates nested keys (`UPKEEP_API__BASE_DOMAIN`).
pub const ENV_PREFIX: &str = "UPKEEP_";

const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

/// Configuration provider using figment
///
/// Sources are merged in precedence order (later sources override earlier ones):
/// 1. Default values
/// 2. Global file (`~/.upkeep/upkeep.*`)
/// 3. Project file (`./.upkeep/upkeep.*`)
/// 4. Explicit file passed with `with_file`
/// 5. Environment variables with the `UPKEEP_` prefix
#[derive(Debug, Default)]
pub struct ConfigProvider {
    global_dir: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    explicit_file: Option<PathBuf>,
}

impl ConfigProvider {
    /// Create a provider searching the standard directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `dir` instead of `~/.upkeep`
    pub fn with_global_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_dir = Some(dir.into());
        self
    }

    /// Search `dir` instead of `./.upkeep`
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// Merge `path` above discovered files. It must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Load, merge and validate configuration from all sources
    pub fn load(&self) -> ConfigResult<UpkeepConfig> {
        debug!("Loading configuration from all sources");

        let config: UpkeepConfig = self.build_figment()?.extract()?;
        config.validate()?;

        info!(
            base_domain = %config.api.base_domain,
            requests_per_second = config.api.requests_per_second,
            "configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(UpkeepConfig::default()));

        let global_dir = self
            .global_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME)));
        let project_dir = self.project_dir.clone().or_else(|| {
            std::env::current_dir()
                .ok()
                .map(|cwd| cwd.join(CONFIG_DIR_NAME))
        });

        for dir in [global_dir, project_dir].into_iter().flatten() {
            for path in discover(&dir) {
                trace!("Loading config file: {}", path.display());
                figment = figment.merge(file_provider(&path)?);
            }
        }

        if let Some(path) = &self.explicit_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound { path: path.clone() });
            }
            figment = figment.merge(file_provider(path)?);
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }
}

/// Config files present in `dir`, in extension order.
fn discover(dir: &Path) -> Vec<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_FILE_STEM}.{ext}")))
        .filter(|path| path.is_file())
        .collect()
}

fn file_provider(path: &Path) -> ConfigResult<Figment> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "toml" => Ok(Figment::from(Toml::file(path))),
        "yaml" | "yml" => Ok(Figment::from(Yaml::file(path))),
        "json" => Ok(Figment::from(Json::file(path))),
        _ => Err(ConfigError::UnsupportedFormat { format: ext }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn isolated(temp: &TempDir) -> ConfigProvider {
        ConfigProvider::new()
            .with_global_dir(temp.path().join("global"))
            .with_project_dir(temp.path().join("project"))
    }

    #[test]
    #[serial]
    fn defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config = isolated(&temp).load().unwrap();
        assert_eq!(config, UpkeepConfig::default());
    }

    #[test]
    #[serial]
    fn project_overrides_global() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("global")).unwrap();
        fs::create_dir_all(temp.path().join("project")).unwrap();
        fs::write(
            temp.path().join("global/upkeep.toml"),
            "[api]\nbase_domain = \"global.example.com\"\nmax_retries = 3\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("project/upkeep.yaml"),
            "api:\n  base_domain: console.acme-cmms.io\n",
        )
        .unwrap();

        let config = isolated(&temp).load().unwrap();
        assert_eq!(config.api.base_domain, "console.acme-cmms.io");
        assert_eq!(config.api.max_retries, 3);
    }

    #[test]
    #[serial]
    fn missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = isolated(&temp)
            .with_file(temp.path().join("absent.toml"))
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    #[serial]
    fn unsupported_extension_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upkeep.ini");
        fs::write(&path, "x=1").unwrap();
        let result = isolated(&temp).with_file(&path).load();
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    #[serial]
    fn invalid_values_fail_validation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, r#"{"api": {"requests_per_second": 0}}"#).unwrap();
        let result = isolated(&temp).with_file(&path).load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}

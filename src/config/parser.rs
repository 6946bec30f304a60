use super::Config;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_NAMES: [&str; 2] = ["warden.yaml", "warden.yml"];

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Pick the config file: an explicit path wins, then the nearest
    /// `warden.yaml` walking up from the current directory, then the user
    /// config directory.
    pub fn locate(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(Error::Config(format!(
                "Config file '{}' does not exist",
                path.display()
            )));
        }

        let current_dir = std::env::current_dir()?;
        match Self::find_config_in_dir(&current_dir) {
            Ok(path) => Ok(path),
            Err(err) => Self::user_config_file().ok_or(err),
        }
    }

    pub fn find_config_in_dir(dir: &Path) -> Result<PathBuf> {
        for ancestor in dir.ancestors() {
            for name in CONFIG_NAMES {
                let candidate = ancestor.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }

        Err(Error::Config(
            "Could not find warden.yaml in current directory or any parent".to_string(),
        ))
    }

    /// `$XDG_CONFIG_HOME/warden/warden.yaml` (or the platform equivalent), if present.
    fn user_config_file() -> Option<PathBuf> {
        let dir = dirs::config_dir()?.join("warden");
        CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    /// Load config from file path, resolving relative paths against its directory.
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut config = self.parse_config(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse config from YAML string
    pub fn parse_config(&self, content: &str) -> Result<Config> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| Error::Parse(format!("Failed to parse YAML config: {}", e)))?;

        Ok(config)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::config::DeskcastConfig;

/// Production implementation of `ConfigStore` that reads a YAML file.
///
/// Path precedence: explicit `--config`, then `DESKCAST_CONFIG`, then
/// `~/.deskcast/config.yaml`.
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<DeskcastConfig> {
        let path = self.path()?;
        let config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        } else if self.explicit.is_some() {
            anyhow::bail!("config file {} does not exist", path.display());
        } else {
            DeskcastConfig::default()
        };
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var("DESKCAST_CONFIG") {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".deskcast").join("config.yaml"))
    }
}

//! Matcher configuration loaded from YAML.
//!
//! ```yaml
//! rootDir: ./stubs
//! malformedBody: reject
//! ```

use crate::error::ConfigError;
use crate::exclusion::{ExclusionRules, EXCLUDES_ROOT};
use crate::predicate::{MalformedBodyPolicy, MatchContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherConfig {
    /// Root of the stub tree; exclusion rules live in `<rootDir>/__excludes`.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    #[serde(default)]
    pub malformed_body: MalformedBodyPolicy,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            malformed_body: MalformedBodyPolicy::default(),
        }
    }
}

impl MatcherConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MatcherConfig =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("rootDir must not be empty".to_string()));
        }
        if self.root_dir.exists() && !self.root_dir.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "rootDir {:?} is not a directory",
                self.root_dir
            )));
        }
        Ok(())
    }

    pub fn excludes_dir(&self) -> PathBuf {
        self.root_dir.join(EXCLUDES_ROOT)
    }

    /// Load exclusion rules and build the context every pattern compiles
    /// against.
    pub fn match_context(&self) -> MatchContext {
        let exclusions = ExclusionRules::load_dir(&self.excludes_dir());
        info!(
            "Loaded {} excluded node(s) from {}",
            exclusions.len(),
            self.excludes_dir().display()
        );
        MatchContext::new(Arc::new(exclusions)).with_malformed_body_policy(self.malformed_body)
    }
}

//! Exclusion rule set: element names stripped from XML bodies before comparison.
//!
//! Rules are read once at startup from every `*.json` file under
//! `<root>/__excludes`, each shaped like `{"excludeNodes": ["a", "b"]}`. The
//! resulting [`ExclusionRules`] is immutable; share it with `Arc`.

use crate::error::ExclusionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Directory (under the root dir) holding exclusion rule files.
pub const EXCLUDES_ROOT: &str = "__excludes";

/// File written when the exclusion directory has to be bootstrapped.
pub const DEFAULT_EXCLUDE_FILE: &str = "exclude.json";

/// Starter rule list written to [`DEFAULT_EXCLUDE_FILE`].
pub const DEFAULT_EXCLUDE_NODES: &[&str] = &["dateAndTime", "ipAddress"];

/// On-disk shape of one exclusion rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludeFile {
    #[serde(default)]
    pub exclude_nodes: Vec<String>,
}

/// Ordered, de-duplicated set of element names to exclude.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    exclude_nodes: Vec<String>,
}

impl ExclusionRules {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rules = Self::empty();
        rules.extend(nodes.into_iter().map(Into::into));
        rules
    }

    fn extend(&mut self, nodes: impl IntoIterator<Item = String>) {
        for node in nodes {
            if !self.exclude_nodes.contains(&node) {
                self.exclude_nodes.push(node);
            }
        }
    }

    /// Element names in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.exclude_nodes.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exclude_nodes.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.exclude_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exclude_nodes.is_empty()
    }

    /// Load the rules under `<root_dir>/__excludes`.
    pub fn load_from_root(root_dir: &Path) -> Self {
        Self::load_dir(&root_dir.join(EXCLUDES_ROOT))
    }

    /// Load and union every `*.json` rule file found (recursively) in `dir`.
    ///
    /// A missing directory is created with a default rule file first. Nothing
    /// here is fatal: unreadable or malformed files are logged and skipped, and
    /// a failed bootstrap leaves the rule set empty.
    pub fn load_dir(dir: &Path) -> Self {
        debug!("Reading excludes from: {}", dir.display());

        if !dir.exists() {
            match bootstrap_default(dir) {
                Ok(path) => debug!("Created default exclude file {}", path.display()),
                Err(e) => {
                    error!("{e}");
                    return Self::empty();
                }
            }
        }

        let mut rules = Self::empty();
        for path in collect_json_files(dir) {
            match read_exclude_file(&path) {
                Ok(file) => {
                    debug!(
                        "Loaded {} excluded node(s) from {}",
                        file.exclude_nodes.len(),
                        path.display()
                    );
                    rules.extend(file.exclude_nodes);
                }
                Err(e) => error!("{e}"),
            }
        }

        debug!("Registered excluded nodes: {rules}");
        rules
    }
}

impl fmt::Display for ExclusionRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.exclude_nodes {
            write!(f, "[{node}]")?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionRules {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_nodes(iter)
    }
}

/// Create `dir` and write the default rule file into it.
pub fn bootstrap_default(dir: &Path) -> Result<PathBuf, ExclusionError> {
    let bootstrap_err = |source| ExclusionError::Bootstrap {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(bootstrap_err)?;

    let file = ExcludeFile {
        exclude_nodes: DEFAULT_EXCLUDE_NODES.iter().map(|s| s.to_string()).collect(),
    };
    let json = serde_json::to_string(&file).map_err(|e| bootstrap_err(e.into()))?;

    let path = dir.join(DEFAULT_EXCLUDE_FILE);
    fs::write(&path, json).map_err(bootstrap_err)?;
    Ok(path)
}

/// Read a single rule file.
pub fn read_exclude_file(path: &Path) -> Result<ExcludeFile, ExclusionError> {
    let content = fs::read_to_string(path).map_err(|source| ExclusionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ExclusionError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn collect_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(source) => {
                error!(
                    "{}",
                    ExclusionError::Io {
                        path: current,
                        source
                    }
                );
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
    }

    files.sort();
    files
}

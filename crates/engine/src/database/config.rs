//! Store configuration via `viewstore.toml`
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! standard behavior. Values are validated eagerly on load.

use serde::{Deserialize, Serialize};
use std::path::Path;
use viewstore_core::{Error, Result};
use viewstore_mapfn::{
    Limits, DEFAULT_MAX_DEPTH, DEFAULT_MAX_VALUE_SIZE, DEFAULT_STEP_LIMIT, MAX_DEPTH_CEILING,
};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "viewstore.toml";

/// Store configuration
///
/// # Example
///
/// ```toml
/// enforce_lock_on_replace = true
/// initial_cas = 100
/// script_step_limit = 100000
/// script_max_depth = 256
/// script_max_value_size = 4194304
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStoreConfig {
    /// Reject `replace` on a locked key unless the cas matches.
    /// With `false`, only `set`, `delete` and `unlock` check locks.
    #[serde(default = "default_enforce_lock_on_replace")]
    pub enforce_lock_on_replace: bool,
    /// First CAS token handed out by `lock`
    #[serde(default = "default_initial_cas")]
    pub initial_cas: u64,
    /// Step budget for one map function evaluation
    #[serde(default = "default_script_step_limit")]
    pub script_step_limit: u64,
    /// Nesting limit for map function parsing and evaluation
    #[serde(default = "default_script_max_depth")]
    pub script_max_depth: usize,
    /// Size budget for strings, arrays and objects a map function builds
    #[serde(default = "default_script_max_value_size")]
    pub script_max_value_size: usize,
}

fn default_enforce_lock_on_replace() -> bool {
    true
}

fn default_initial_cas() -> u64 {
    100
}

fn default_script_step_limit() -> u64 {
    DEFAULT_STEP_LIMIT
}

fn default_script_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_script_max_value_size() -> usize {
    DEFAULT_MAX_VALUE_SIZE
}

impl Default for ViewStoreConfig {
    fn default() -> Self {
        Self {
            enforce_lock_on_replace: default_enforce_lock_on_replace(),
            initial_cas: default_initial_cas(),
            script_step_limit: default_script_step_limit(),
            script_max_depth: default_script_max_depth(),
            script_max_value_size: default_script_max_value_size(),
        }
    }
}

impl ViewStoreConfig {
    /// Reject values the store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.initial_cas == 0 {
            return Err(Error::InvalidInput(
                "initial_cas must be positive; 0 is reserved for \"no cas\"".to_string(),
            ));
        }
        if self.script_step_limit == 0 {
            return Err(Error::InvalidInput(
                "script_step_limit must be positive".to_string(),
            ));
        }
        if self.script_max_depth == 0 || self.script_max_depth > MAX_DEPTH_CEILING {
            return Err(Error::InvalidInput(format!(
                "script_max_depth must be between 1 and {}",
                MAX_DEPTH_CEILING
            )));
        }
        if self.script_max_value_size == 0 {
            return Err(Error::InvalidInput(
                "script_max_value_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Map function bounds derived from this config
    pub fn limits(&self) -> Limits {
        Limits {
            step_limit: self.script_step_limit,
            max_depth: self.script_max_depth,
            max_value_size: self.script_max_value_size,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# viewstore configuration
#
# Reject replace() on a locked key unless the caller passes the lock's cas.
# With false, only set(), delete() and unlock() check locks.
enforce_lock_on_replace = true

# First cas token handed out by lock(). Tokens only ever increase.
initial_cas = 100

# Bounds for each map function run. A run that exceeds any of them
# emits nothing for that document. script_max_depth is at most 512.
script_step_limit = 100000
script_max_depth = 256
script_max_value_size = 4194304
"#
    }

    /// Parse and validate config text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ViewStoreConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidInput(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::InvalidInput(msg) => {
                Error::InvalidInput(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON configuration files.
//!
//! Each file is looked up by name in a fixed list of directories and the
//! first match wins: the current directory, then `/etc/homecontrol`, then
//! the user's home directory.
//!
//! # Examples
//!
//! ```no_run
//! use homecontrol::config::{ConfigLoader, HueConfig};
//!
//! # fn example() -> homecontrol::Result<()> {
//! let hue: HueConfig = ConfigLoader::new().load()?;
//! let ca = hue.ca_cert_pem()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::hue::HUE_ROOT_CA;

/// System wide configuration directory.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/homecontrol";

/// A configuration file with a well-known name.
pub trait ConfigFile: Serialize + DeserializeOwned {
    /// File name looked up in every search directory.
    const FILE_NAME: &'static str;

    /// Writes this configuration to `path` as pretty printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] if the file cannot be written.
    fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

/// Finds and parses configuration files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    search_dirs: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Searches the current directory, `/etc/homecontrol` and the home
    /// directory, in that order.
    #[must_use]
    pub fn new() -> Self {
        let mut search_dirs = Vec::with_capacity(3);
        if let Ok(cwd) = std::env::current_dir() {
            search_dirs.push(cwd);
        }
        search_dirs.push(PathBuf::from(SYSTEM_CONFIG_DIR));
        if let Some(home) = dirs::home_dir() {
            search_dirs.push(home);
        }
        Self { search_dirs }
    }

    /// Searches only `search_dirs`, in order.
    #[must_use]
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// Returns every candidate path for `file`, in search order.
    #[must_use]
    pub fn search_paths(&self, file: &str) -> Vec<PathBuf> {
        self.search_dirs.iter().map(|dir| dir.join(file)).collect()
    }

    /// Returns the first existing candidate path for `file`.
    #[must_use]
    pub fn find(&self, file: &str) -> Option<PathBuf> {
        self.search_paths(file).into_iter().find(|path| path.is_file())
    }

    /// Loads `T` from the first matching file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] listing every searched path.
    /// - [`ConfigError::Read`] or [`ConfigError::Parse`] for a bad file.
    pub fn load<T: ConfigFile>(&self) -> Result<T> {
        let Some(path) = self.find(T::FILE_NAME) else {
            return Err(ConfigError::NotFound {
                file: T::FILE_NAME.to_string(),
                searched: self
                    .search_paths(T::FILE_NAME)
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect(),
            }
            .into());
        };
        load_from(&path)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads `T` from an explicit path.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
pub fn load_from<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

// ============================================================================
// Files
// ============================================================================

/// `hue.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueConfig {
    /// PEM file with the Hue root CA. The built-in copy is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
    /// Discover bridges over mDNS rather than the cloud endpoint.
    #[serde(default, alias = "mDNS_discovery")]
    pub mdns_discovery: bool,
}

impl HueConfig {
    /// Returns the CA certificate to pin.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if `ca_cert` is set but unreadable.
    pub fn ca_cert_pem(&self) -> Result<Vec<u8>> {
        match &self.ca_cert {
            Some(path) => Ok(fs::read(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?),
            None => Ok(HUE_ROOT_CA.to_vec()),
        }
    }
}

impl ConfigFile for HueConfig {
    const FILE_NAME: &'static str = "hue.json";
}

/// Midea cloud credentials, used to fetch a unit's key and token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MideaAccount {
    /// Account e-mail.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for MideaAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MideaAccount")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// `midea.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MideaConfig {
    /// Cloud account.
    pub account: MideaAccount,
}

impl ConfigFile for MideaConfig {
    const FILE_NAME: &'static str = "midea.json";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn write(dir: &Path, file: &str, contents: &str) {
        fs::write(dir.join(file), contents).unwrap();
    }

    #[test]
    fn first_directory_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), "hue.json", r#"{"mdns_discovery": true}"#);
        write(second.path(), "hue.json", r#"{"mdns_discovery": false}"#);

        let loader =
            ConfigLoader::with_search_dirs(vec![first.path().into(), second.path().into()]);
        let config: HueConfig = loader.load().unwrap();

        assert!(config.mdns_discovery);
    }

    #[test]
    fn later_directory_is_used_when_earlier_lacks_file() {
        let empty = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(
            second.path(),
            "midea.json",
            r#"{"account": {"username": "me@example.com", "password": "hunter2"}}"#,
        );

        let loader =
            ConfigLoader::with_search_dirs(vec![empty.path().into(), second.path().into()]);
        let config: MideaConfig = loader.load().unwrap();

        assert_eq!(config.account.username, "me@example.com");
        assert!(!format!("{:?}", config.account).contains("hunter2"));
    }

    #[test]
    fn missing_file_lists_searched_paths() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_search_dirs(vec![a.path().into(), b.path().into()]);

        let err = loader.load::<HueConfig>().unwrap_err();

        let Error::Config(ConfigError::NotFound { file, searched }) = err else {
            panic!("expected NotFound, got {err:?}");
        };
        assert_eq!(file, "hue.json");
        assert_eq!(searched.len(), 2);
        assert!(searched[1].ends_with("hue.json"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "hue.json", "{not json");
        let loader = ConfigLoader::with_search_dirs(vec![dir.path().into()]);

        let err = loader.load::<HueConfig>().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn legacy_mdns_key_is_accepted() {
        let config: HueConfig = serde_json::from_str(r#"{"mDNS_discovery": true}"#).unwrap();
        assert!(config.mdns_discovery);
        assert_eq!(config.ca_cert_pem().unwrap(), HUE_ROOT_CA);
    }

    #[test]
    fn custom_ca_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ca = dir.path().join("ca.pem");
        fs::write(&ca, b"PEM").unwrap();
        let config = HueConfig {
            ca_cert: Some(ca),
            mdns_discovery: false,
        };

        assert_eq!(config.ca_cert_pem().unwrap(), b"PEM");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = HueConfig {
            ca_cert: None,
            mdns_discovery: true,
        };
        config.save_to(&dir.path().join(HueConfig::FILE_NAME)).unwrap();

        let loaded: HueConfig = ConfigLoader::with_search_dirs(vec![dir.path().into()])
            .load()
            .unwrap();
        assert_eq!(loaded, config);
    }
}

//! INI configuration file.
//!
//! ```ini
//! [mirror]
//! output_dir = /srv/go
//! proxy_url = https://proxy.golang.org
//!
//! [sync]
//! workers = 10
//! batch_size = 2000
//! skip_pseudo_versions = true
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;

use super::ConfigError;

/// Settings read from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub output_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub checkpoint_file: Option<PathBuf>,
    pub proxy_url: Option<String>,
    pub index_url: Option<String>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub retries: Option<u32>,
    pub skip_pseudo_versions: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// `<config dir>/modsync/config.ini`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("modsync").join("config.ini"))
}

impl ConfigFile {
    /// Reads `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Reads `path`, or the default location when `None`.
    ///
    /// A missing default file yields empty settings; an explicit path
    /// must exist.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses INI text.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(source).map_err(|err| {
            ConfigError::Invalid(format!("config file is not valid INI: {err}"))
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let get = |section: &str, key: &str| {
            ini.section(Some(section))
                .and_then(|props| props.get(key))
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            output_dir: get("mirror", "output_dir").map(PathBuf::from),
            temp_dir: get("mirror", "temp_dir").map(PathBuf::from),
            checkpoint_file: get("mirror", "checkpoint_file").map(PathBuf::from),
            proxy_url: get("mirror", "proxy_url").map(String::from),
            index_url: get("mirror", "index_url").map(String::from),
            workers: parse_value("sync", "workers", get("sync", "workers"))?,
            batch_size: parse_value("sync", "batch_size", get("sync", "batch_size"))?,
            retries: parse_value("sync", "retries", get("sync", "retries"))?,
            skip_pseudo_versions: get("sync", "skip_pseudo_versions")
                .map(|value| parse_bool("sync", "skip_pseudo_versions", value))
                .transpose()?,
            timeout_secs: parse_value("sync", "timeout_secs", get("sync", "timeout_secs"))?,
        })
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: Option<&str>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_all_keys() {
        let file = ConfigFile::parse(
            "[mirror]\noutput_dir = /srv/go\nproxy_url = http://proxy.local\n\n[sync]\nworkers = 10\nbatch_size = 500\nretries = 3\nskip_pseudo_versions = yes\ntimeout_secs = 60\n",
        )
        .unwrap();

        assert_eq!(file.output_dir, Some(PathBuf::from("/srv/go")));
        assert_eq!(file.proxy_url.as_deref(), Some("http://proxy.local"));
        assert_eq!(file.index_url, None);
        assert_eq!(file.workers, Some(10));
        assert_eq!(file.batch_size, Some(500));
        assert_eq!(file.retries, Some(3));
        assert_eq!(file.skip_pseudo_versions, Some(true));
        assert_eq!(file.timeout_secs, Some(60));
    }

    #[test]
    fn test_invalid_number() {
        let err = ConfigFile::parse("[sync]\nworkers = many\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "workers"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[mirror]\nindex_url = http://index.local\n").unwrap();

        let file = ConfigFile::discover(Some(&path)).unwrap();
        assert_eq!(file.index_url.as_deref(), Some("http://index.local"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.ini");
        assert!(matches!(
            ConfigFile::discover(Some(&missing)),
            Err(ConfigError::Load { .. })
        ));
    }
}

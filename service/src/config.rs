//! Loads the two-key configuration file the `service` binary takes as its sole argument:
//!
//! ```text
//! index.directory = <absolute path>
//! watch.directory = <absolute path>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required key {0:?}")]
    MissingKey(&'static str),

    #[error("unrecognised key {0:?} on line {1}")]
    UnrecognisedKey(String, usize),

    #[error("malformed line {0}: {1:?}")]
    MalformedLine(usize, String),

    #[error("path for {key} must be absolute: {path:?}")]
    NotAbsolute { key: &'static str, path: String },

    #[error("path for {key} contains a NUL, CR, or LF byte: {path:?}")]
    ForbiddenByte { key: &'static str, path: String },

    #[error("directory for {key} does not exist or is not a directory: {path}")]
    NotADirectory { key: &'static str, path: PathBuf },

    #[error("directory for {key} is not writable: {path}")]
    NotWritable { key: &'static str, path: PathBuf },
}

/// Resolved, validated configuration for the `service` binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub index_directory: PathBuf,
    pub watch_directory: PathBuf,
}

impl Config {
    /// Read and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut index_directory = None;
        let mut watch_directory = None;

        for (line_no, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine(line_no + 1, raw_line.to_string()));
            };

            let key = key.trim();
            let value = value.trim().to_string();

            match key {
                "index.directory" => index_directory = Some(value),
                "watch.directory" => watch_directory = Some(value),
                other => return Err(ConfigError::UnrecognisedKey(other.to_string(), line_no + 1)),
            }
        }

        let index_directory = validate_directory(
            "index.directory",
            index_directory.ok_or(ConfigError::MissingKey("index.directory"))?,
        )?;
        let watch_directory = validate_directory(
            "watch.directory",
            watch_directory.ok_or(ConfigError::MissingKey("watch.directory"))?,
        )?;

        Ok(Self {
            index_directory,
            watch_directory,
        })
    }
}

fn validate_directory(key: &'static str, raw: String) -> Result<PathBuf, ConfigError> {
    if raw.bytes().any(|b| b == 0 || b == b'\r' || b == b'\n') {
        return Err(ConfigError::ForbiddenByte { key, path: raw });
    }

    let path = PathBuf::from(&raw);
    if !path.is_absolute() {
        return Err(ConfigError::NotAbsolute { key, path: raw });
    }

    if !path.is_dir() {
        return Err(ConfigError::NotADirectory { key, path });
    }

    check_writable(key, &path)?;
    Ok(path)
}

/// Writability is probed, not assumed, so a misconfigured read-only directory surfaces as a
/// real `io::Error` at startup rather than a silent degrade. Attempts to create and remove a
/// uniquely-named throwaway file inside the directory.
fn check_writable(key: &'static str, path: &Path) -> Result<(), ConfigError> {
    let probe = path.join(format!(".indexing-service-writability-probe-{}", std::process::id()));
    match fs::write(&probe, b"") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            Ok(())
        }
        Err(_) => Err(ConfigError::NotWritable {
            key,
            path: path.to_path_buf(),
        }),
    }
}

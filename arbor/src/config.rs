use std::path::{Path, PathBuf};

use arbor_browser::ChildOrder;
use serde::Deserialize;
use thiserror::Error;
use tokio::fs::read_to_string;

use crate::Cli;

const CONFIG_FILE_NAME: &str = "arbor.toml";
const DEFAULT_PREVIEW_MAX_BYTES: u64 = 64 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("arbor config not found at: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    pub root: Option<PathBuf>,
    pub log: Option<String>,
    pub log_file: Option<PathBuf>,
    pub order: Option<ChildOrder>,
    pub default_expand_depth: Option<usize>,
    pub preview_max_bytes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// The config file that was read, if any.
    pub path: Option<PathBuf>,
    /// Directory whose contents are browsed.
    pub root: PathBuf,
    pub log: String,
    pub log_file: Option<PathBuf>,
    pub order: ChildOrder,
    pub default_expand_depth: usize,
    pub preview_max_bytes: u64,
}

impl Config {
    /// Load from `path` (a file, or a directory holding `arbor.toml`).
    ///
    /// A missing file is an error only when `required` is set; otherwise
    /// defaults apply. Command-line values win over file values.
    pub async fn load(path: &Path, cli: &Cli, required: bool) -> Result<Self, ConfigError> {
        let path = if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_owned()
        };

        let (config, path) = if path.exists() {
            (Self::load_config(&path).await?, Some(path))
        } else if required {
            return Err(ConfigError::ConfigNotFound { path });
        } else {
            (ConfigToml::default(), None)
        };

        Ok(Self::resolve(config, path, cli))
    }

    fn resolve(config: ConfigToml, path: Option<PathBuf>, cli: &Cli) -> Self {
        let ConfigToml {
            root,
            log,
            log_file,
            order,
            default_expand_depth,
            preview_max_bytes,
        } = config;

        let base = path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let root = cli
            .root
            .clone()
            .or_else(|| root.map(|root| base.join(root)))
            .unwrap_or_else(|| PathBuf::from("."));

        let log = cli.log.clone().or(log).unwrap_or("error".into());
        let log_file = log_file.map(|log_file| base.join(log_file));

        Config {
            path,
            root,
            log,
            log_file,
            order: order.unwrap_or_default(),
            default_expand_depth: default_expand_depth.unwrap_or(0),
            preview_max_bytes: preview_max_bytes.unwrap_or(DEFAULT_PREVIEW_MAX_BYTES),
        }
    }

    async fn load_config(path: &Path) -> Result<ConfigToml, ConfigError> {
        let string = read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        let config = toml::from_str(&string).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        Ok(config)
    }
}

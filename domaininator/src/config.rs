use libdns_storm::ProbeConfig;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

const CONFIG_NAME: &str = "domaininator";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub pattern: Option<String>,
    pub whitelist: Vec<String>,
    pub workers: usize,
    pub verbose: bool,
    pub showips: bool,
    pub lookups: Vec<String>,
    /// Per-query timeout in seconds.
    pub timeout: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        let probe = ProbeConfig::default();
        Self {
            pattern: None,
            whitelist: Vec::new(),
            workers: probe.workers,
            verbose: probe.verbose,
            showips: probe.show_values,
            lookups: Vec::new(),
            timeout: probe.timeout.as_secs(),
        }
    }
}

impl FileConfig {
    pub fn into_probe_config(self) -> ProbeConfig {
        ProbeConfig {
            workers: self.workers,
            verbose: self.verbose,
            show_values: self.showips,
            whitelist: self.whitelist.into_iter().collect(),
            lookups: self.lookups,
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

/// Places searched for a config file, most specific first.
pub fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(format!("./.{CONFIG_NAME}.toml")),
        PathBuf::from(format!("./{CONFIG_NAME}.toml")),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_NAME).join("config.toml"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{CONFIG_NAME}.toml")));
    }
    paths.push(PathBuf::from(format!("/etc/{CONFIG_NAME}.toml")));
    paths
}

pub fn find_config() -> Option<PathBuf> {
    find_config_in(&default_locations())
}

pub fn find_config_in(paths: &[PathBuf]) -> Option<PathBuf> {
    paths.iter().find(|p| p.is_file()).cloned()
}

pub fn load(path: &Path) -> Result<FileConfig, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn default_config_toml() -> String {
    r#"# Domaininator configuration

# Pattern used when none is given on the command line
# pattern = "go+gle\\.(com|net)"

# Exact domain names that are never looked up
whitelist = []

# Number of parallel workers
workers = 16

# Show all domain names, even if they are not registered
verbose = false

# Show record values (addresses, host names) instead of only the record type
showips = false

# Lookups to do: NS, A, CNAME, MX or ALL
lookups = ["ALL"]

# Per-query timeout in seconds
timeout = 5
"#
    .to_string()
}

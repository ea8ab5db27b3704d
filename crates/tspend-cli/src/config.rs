// crates/tspend-cli/src/config.rs
//
// Global options, the optional TOML config file, and the resolved runtime
// context shared by every subcommand.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tspend_core::{ChainParams, Network, TspendError};
use tspend_rpc::{check_node, DcrdClient, RpcConfig};

pub const APP_DIR: &str = ".tspend";
pub const CONFIG_FILENAME: &str = "tspend.toml";

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Use the main network (default).
    #[arg(long, global = true)]
    pub mainnet: bool,

    /// Use the test network.
    #[arg(long, global = true)]
    pub testnet: bool,

    /// Use the simulation test network.
    #[arg(long, global = true)]
    pub simnet: bool,

    /// Path to the TOML configuration file.
    #[arg(short = 'C', long, global = true)]
    pub configfile: Option<PathBuf>,

    /// Network address of the node's RPC interface
    /// (default: localhost port 9109, testnet: 19109, simnet: 19556).
    #[arg(long, global = true)]
    pub dcrdconnect: Option<String>,

    /// RPC username.
    #[arg(short = 'u', long, global = true)]
    pub dcrduser: Option<String>,

    /// RPC password.
    #[arg(short = 'P', long, global = true)]
    pub dcrdpass: Option<String>,

    /// Path to the node's RPC certificate.
    #[arg(long, global = true)]
    pub dcrdcertpath: Option<String>,

    /// Log filter, e.g. "debug" or "tspend_rpc=trace,info".
    #[arg(short = 'd', long, global = true)]
    pub debuglevel: Option<String>,

    /// Only warn when the node runs an unsupported JSON-RPC API version.
    #[arg(long, global = true)]
    pub ignorerpcversion: bool,
}

impl GlobalOpts {
    /// The selected network. At most one network flag may be given.
    pub fn network(&self) -> Result<Network, TspendError> {
        let selected: Vec<Network> = [
            (self.mainnet, Network::Mainnet),
            (self.testnet, Network::Testnet),
            (self.simnet, Network::Simnet),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .map(|(_, net)| net)
        .collect();

        match selected.as_slice() {
            [] => Ok(Network::default()),
            [net] => Ok(*net),
            _ => Err(TspendError::Config(
                "mainnet, testnet and simnet params can't be used together -- choose one of the three"
                    .to_string(),
            )),
        }
    }
}

/// Settings read from the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FileConfig {
    /// Network address of the node's RPC interface.
    #[serde(default)]
    pub dcrd_connect: Option<String>,

    #[serde(default)]
    pub dcrd_user: String,

    #[serde(default)]
    pub dcrd_pass: String,

    /// Path to the node's RPC certificate.
    #[serde(default)]
    pub dcrd_cert_path: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Extra hex encoded public keys accepted as Pi keys.
    #[serde(default)]
    pub pi_keys: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            dcrd_connect: None,
            dcrd_user: String::new(),
            dcrd_pass: String::new(),
            dcrd_cert_path: None,
            log_level: default_log_level(),
            pi_keys: Vec::new(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self, TspendError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            TspendError::Config(format!("unable to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            TspendError::Config(format!("unable to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load the explicitly named file, or the default one if it exists.
    /// A missing default file yields the defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, TspendError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_file() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR))
}

pub fn default_config_file() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

pub fn default_cert_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".dcrd").join("rpc.cert"))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Context {
    pub network: Network,
    pub params: ChainParams,
    pub rpc_host: String,
    pub rpc_user: String,
    pub rpc_pass: String,
    pub cert_path: Option<PathBuf>,
    /// Whether `cert_path` was chosen by the user rather than defaulted.
    pub cert_path_explicit: bool,
    pub ignore_rpc_version: bool,
}

impl Context {
    /// Merge command line options over the config file. Command line wins.
    pub fn build(opts: &GlobalOpts, file: &FileConfig) -> Result<Self, TspendError> {
        let network = opts.network()?;
        let params = network.params().with_pi_keys(file.pi_keys.as_slice())?;

        let rpc_host = opts
            .dcrdconnect
            .clone()
            .or_else(|| file.dcrd_connect.clone())
            .unwrap_or_else(|| format!("localhost:{}", network.default_rpc_port()));

        let explicit_cert = opts
            .dcrdcertpath
            .as_deref()
            .or(file.dcrd_cert_path.as_deref());
        let (cert_path, cert_path_explicit) = match explicit_cert {
            Some(p) => (Some(expand_tilde(p)), true),
            None => (default_cert_path(), false),
        };

        Ok(Self {
            network,
            params,
            rpc_host,
            rpc_user: opts.dcrduser.clone().unwrap_or_else(|| file.dcrd_user.clone()),
            rpc_pass: opts.dcrdpass.clone().unwrap_or_else(|| file.dcrd_pass.clone()),
            cert_path,
            cert_path_explicit,
            ignore_rpc_version: opts.ignorerpcversion,
        })
    }

    /// Read the RPC certificate. A missing default certificate falls back
    /// to the system trust roots; a missing explicit one is an error.
    pub fn load_cert(&self) -> Result<Option<Vec<u8>>, TspendError> {
        let Some(path) = &self.cert_path else {
            return Ok(None);
        };
        match fs::read(path) {
            Ok(pem) => Ok(Some(pem)),
            Err(e) if !self.cert_path_explicit => {
                debug!("No RPC certificate at {}: {}", path.display(), e);
                Ok(None)
            }
            Err(e) => Err(TspendError::Config(format!(
                "unable to load RPC cert file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn rpc_config(&self) -> Result<RpcConfig, TspendError> {
        Ok(RpcConfig {
            host: self.rpc_host.clone(),
            user: self.rpc_user.clone(),
            pass: self.rpc_pass.clone(),
            cert_pem: self.load_cert()?,
        })
    }

    /// Connect to the node and run the early connectivity check.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<DcrdClient, TspendError> {
        let client = DcrdClient::new(&self.rpc_config()?)?;
        let version = check_node(&client, &self.params, self.ignore_rpc_version, cancel)
            .await
            .map_err(|e| match e {
                TspendError::Cancelled => e,
                e => TspendError::Connectivity(format!(
                    "error while checking node at {}: {}",
                    self.rpc_host, e
                )),
            })?;
        info!("Using node {} at {}", version, client.url());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_network_selection() {
        let opts = GlobalOpts::default();
        assert_eq!(opts.network().unwrap(), Network::Mainnet);

        let opts = GlobalOpts {
            simnet: true,
            ..Default::default()
        };
        assert_eq!(opts.network().unwrap(), Network::Simnet);

        let opts = GlobalOpts {
            testnet: true,
            simnet: true,
            ..Default::default()
        };
        assert!(matches!(opts.network(), Err(TspendError::Config(_))));
    }

    #[test]
    fn test_file_defaults() {
        let cfg: FileConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, FileConfig::default());
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "dcrd_connect = \"10.0.0.5:19109\"\ndcrd_user = \"alice\"\ndcrd_pass = \"secret\"\nlog_level = \"debug\""
        )
        .unwrap();
        let cfg = FileConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(cfg.dcrd_connect.as_deref(), Some("10.0.0.5:19109"));
        assert_eq!(cfg.dcrd_user, "alice");
        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.dcrd_cert_path.is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            FileConfig::load_or_default(Some(&missing)),
            Err(TspendError::Config(_))
        ));
    }

    #[test]
    fn test_bad_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dcrd_user = [not toml").unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_context_defaults_per_network() {
        let file = FileConfig::default();
        let opts = GlobalOpts {
            testnet: true,
            ..Default::default()
        };
        let ctx = Context::build(&opts, &file).unwrap();
        assert_eq!(ctx.rpc_host, "localhost:19109");
        assert_eq!(ctx.params.name, "testnet3");
        assert!(!ctx.cert_path_explicit);
    }

    #[test]
    fn test_command_line_overrides_file() {
        let file = FileConfig {
            dcrd_connect: Some("file-host:1".to_string()),
            dcrd_user: "file-user".to_string(),
            ..Default::default()
        };
        let opts = GlobalOpts {
            dcrdconnect: Some("cli-host:2".to_string()),
            ..Default::default()
        };
        let ctx = Context::build(&opts, &file).unwrap();
        assert_eq!(ctx.rpc_host, "cli-host:2");
        assert_eq!(ctx.rpc_user, "file-user");
    }

    #[test]
    fn test_missing_explicit_cert_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = GlobalOpts {
            dcrdcertpath: Some(dir.path().join("rpc.cert").display().to_string()),
            ..Default::default()
        };
        let ctx = Context::build(&opts, &FileConfig::default()).unwrap();
        assert!(matches!(ctx.load_cert(), Err(TspendError::Config(_))));
    }

    #[test]
    fn test_cert_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "-----BEGIN CERTIFICATE-----").unwrap();
        let opts = GlobalOpts {
            dcrdcertpath: Some(file.path().display().to_string()),
            ..Default::default()
        };
        let ctx = Context::build(&opts, &FileConfig::default()).unwrap();
        assert_eq!(
            ctx.load_cert().unwrap().unwrap(),
            b"-----BEGIN CERTIFICATE-----".to_vec()
        );
    }

    #[test]
    fn test_bad_pi_key_in_file() {
        let file = FileConfig {
            pi_keys: vec!["abcd".to_string()],
            ..Default::default()
        };
        assert!(Context::build(&GlobalOpts::default(), &file).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/etc/x"), PathBuf::from("/etc/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/a/b"), home.join("a/b"));
        }
    }
}

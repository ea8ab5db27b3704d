// crates/tspend-core/src/error.rs
//
// Error taxonomy shared by every crate in the workspace.

use thiserror::Error;

/// JSON-RPC error code the node returns when a submitted transaction is
/// already known (in the mempool or the chain).
pub const RPC_ERR_DUPLICATE_TX: i64 = -40;

/// Fatal errors. The first one raised aborts the whole operation.
#[derive(Debug, Error)]
pub enum TspendError {
    /// Bad or conflicting user configuration, reported before any chain
    /// interaction.
    #[error("Config error: {0}")]
    Config(String),

    /// Node unreachable, on the wrong network, or speaking an unsupported
    /// RPC version.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A signed treasury spend failed structural validation.
    #[error("Consensus check failed: {0}")]
    ConsensusCheck(String),

    /// Chain data is inconsistent (e.g. treasury updates and block contents
    /// disagree).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Error reported by the node for an RPC call.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Wire, hex or address decoding error.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Key parsing or signing error.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Local I/O error (files, stdin/stdout).
    #[error("I/O error: {0}")]
    Io(String),

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl TspendError {
    /// Whether this is the node telling us it already has the transaction.
    pub fn is_duplicate_tx(&self) -> bool {
        matches!(self, TspendError::Rpc { code, .. } if *code == RPC_ERR_DUPLICATE_TX)
    }

    /// Prefix the message with `ctx`, keeping the error category.
    pub fn context(self, ctx: &str) -> Self {
        use TspendError::*;
        match self {
            Config(m) => Config(format!("{}: {}", ctx, m)),
            Connectivity(m) => Connectivity(format!("{}: {}", ctx, m)),
            ConsensusCheck(m) => ConsensusCheck(format!("{}: {}", ctx, m)),
            DataIntegrity(m) => DataIntegrity(format!("{}: {}", ctx, m)),
            Rpc { code, message } => Rpc {
                code,
                message: format!("{}: {}", ctx, message),
            },
            Encoding(m) => Encoding(format!("{}: {}", ctx, m)),
            Crypto(m) => Crypto(format!("{}: {}", ctx, m)),
            Io(m) => Io(format!("{}: {}", ctx, m)),
            Cancelled => Cancelled,
            NotFound(m) => NotFound(format!("{}: {}", ctx, m)),
        }
    }
}

impl From<serde_json::Error> for TspendError {
    fn from(e: serde_json::Error) -> Self {
        TspendError::Encoding(e.to_string())
    }
}

impl From<hex::FromHexError> for TspendError {
    fn from(e: hex::FromHexError) -> Self {
        TspendError::Encoding(format!("invalid hex: {}", e))
    }
}

impl From<std::io::Error> for TspendError {
    fn from(e: std::io::Error) -> Self {
        TspendError::Io(e.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for TspendError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        TspendError::Crypto(e.to_string())
    }
}

/// Non-fatal conditions surfaced while building. The transaction is still
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyWarning {
    /// A payout output failed the relay policy checks.
    #[error("output {index} ({address}, {amount} atoms) failed check: {reason}")]
    Output {
        index: usize,
        address: String,
        amount: i64,
        reason: String,
    },

    /// The signing key is not one of the network's authorized Pi keys.
    #[error("signing key {0} does not correspond to a Pi key for the selected network")]
    UnknownPiKey(String),
}

// crates/tspend-cli/src/keys.rs
//
// Signing key loading. Every buffer that holds key material is zeroized when
// dropped, including on error paths.

use std::fs;
use std::io::{self, ErrorKind, IsTerminal, Read};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use tspend_core::crypto::{SecretKeyBytes, SECRET_KEY_SIZE};
use tspend_core::{Network, TspendError};

use crate::config::app_dir;

/// Size of std's stdin buffer. Reads at least this large go straight to the
/// file descriptor, so the key is never copied into that buffer.
const READ_CHUNK: usize = 8 * 1024;
const MAX_KEY_INPUT: usize = 4 * READ_CHUNK;

/// Where the signing key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Hex given on the command line.
    Hex(Zeroizing<String>),
    /// Hex read from standard input (`--privkey -`).
    Stdin,
    /// Hex stored in a file.
    File(PathBuf),
}

impl KeySource {
    /// Pick the key source from the flags. Without either flag the per
    /// network key file in the app directory is used. The command line key
    /// is moved in, not copied.
    pub fn from_flags(
        privkey: Option<Zeroizing<String>>,
        privkeyfile: Option<&Path>,
        network: Network,
    ) -> Result<Self, TspendError> {
        match (privkey, privkeyfile) {
            (Some(_), Some(_)) => Err(TspendError::Config(
                "--privkey and --privkeyfile can't be used together".to_string(),
            )),
            (Some(hex), None) if hex.as_str() == "-" => Ok(KeySource::Stdin),
            (Some(hex), None) => Ok(KeySource::Hex(hex)),
            (None, Some(path)) => Ok(KeySource::File(path.to_path_buf())),
            (None, None) => {
                let dir = app_dir().ok_or_else(|| {
                    TspendError::Config("could not determine home directory".to_string())
                })?;
                Ok(KeySource::File(dir.join(format!("{}.key", network))))
            }
        }
    }

    /// Load the key.
    pub fn read(&self) -> Result<SecretKeyBytes, TspendError> {
        match self {
            KeySource::Hex(hex) => parse_secret_hex(hex),
            KeySource::Stdin => {
                let stdin = io::stdin();
                if stdin.is_terminal() {
                    // Read without echo.
                    let line =
                        Zeroizing::new(rpassword::prompt_password("Input the private key: ")?);
                    parse_secret_hex(&line)
                } else {
                    read_secret(stdin)
                }
            }
            KeySource::File(path) => {
                let contents = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
                    TspendError::Config(format!(
                        "unable to read private key file {}: {}",
                        path.display(),
                        e
                    ))
                })?);
                parse_secret_hex(&contents)
            }
        }
    }
}

/// Read the first line of hex from `reader` into a zeroizing buffer.
pub fn read_secret<R: Read>(mut reader: R) -> Result<SecretKeyBytes, TspendError> {
    let mut buf = Zeroizing::new(vec![0u8; MAX_KEY_INPUT]);
    let mut filled = 0;
    while filled + READ_CHUNK <= buf.len() {
        let n = match reader.read(&mut buf[filled..filled + READ_CHUNK]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        filled += n;
        if buf[..filled].contains(&b'\n') {
            break;
        }
    }

    let line_end = buf[..filled]
        .iter()
        .position(|b| *b == b'\n')
        .unwrap_or(filled);
    let line = std::str::from_utf8(&buf[..line_end])
        .map_err(|_| TspendError::Crypto("private key is not valid hex".to_string()))?;
    parse_secret_hex(line)
}

/// Decode a 32-byte hex encoded secret key.
pub fn parse_secret_hex(s: &str) -> Result<SecretKeyBytes, TspendError> {
    let trimmed = s.trim();
    if trimmed.len() != 2 * SECRET_KEY_SIZE {
        return Err(TspendError::Crypto(format!(
            "private key must be {} hex characters",
            2 * SECRET_KEY_SIZE
        )));
    }
    let mut key = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
    hex::decode_to_slice(trimmed, key.as_mut_slice())
        .map_err(|e| TspendError::Crypto(format!("invalid private key hex: {}", e)))?;
    Ok(key)
}

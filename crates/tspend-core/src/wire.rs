// crates/tspend-core/src/wire.rs
//
// Binary wire format for transactions and blocks.
//
// Transactions serialize as a version word (low 16 bits tx version, high 16
// bits serialization type) followed by the prefix (inputs' outpoints and
// sequences, outputs, lock time, expiry) and the witness (per-input value
// in, block height/index and signature script). All integers are
// little-endian; counts and byte strings use var-int length prefixes.

use serde::Serialize;

use crate::error::TspendError;
use crate::hash::{sha256, Hash, HASH_SIZE};

pub const TX_VERSION_TREASURY: u16 = 3;
pub const MAX_PREV_OUT_INDEX: u32 = 0xffff_ffff;
pub const MAX_TX_IN_SEQUENCE: u32 = 0xffff_ffff;
pub const NULL_BLOCK_HEIGHT: u32 = 0;
pub const NULL_BLOCK_INDEX: u32 = 0xffff_ffff;
pub const TX_TREE_REGULAR: i8 = 0;
pub const TX_TREE_STAKE: i8 = 1;

/// Serialized size of a block header.
pub const BLOCK_HEADER_SIZE: usize = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
enum SerType {
    Full = 0,
    NoWitness = 1,
}

/// Number of bytes needed to var-int encode `val`.
pub fn var_int_size(val: u64) -> usize {
    if val < 0xfd {
        1
    } else if val <= 0xffff {
        3
    } else if val <= 0xffff_ffff {
        5
    } else {
        9
    }
}

pub fn write_var_int(buf: &mut Vec<u8>, val: u64) {
    if val < 0xfd {
        buf.push(val as u8);
    } else if val <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(val as u16).to_le_bytes());
    } else if val <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(val as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&val.to_le_bytes());
    }
}

pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_var_int(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Cursor over a byte slice with bounds-checked little-endian reads.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], TspendError> {
        if self.remaining() < n {
            return Err(TspendError::Encoding(format!(
                "unexpected end of data: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TspendError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, TspendError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, TspendError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, TspendError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, TspendError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_hash(&mut self) -> Result<Hash, TspendError> {
        Ok(Hash(self.read_array::<HASH_SIZE>()?))
    }

    pub fn read_var_int(&mut self) -> Result<u64, TspendError> {
        let disc = self.read_u8()?;
        let val = match disc {
            0xff => u64::from_le_bytes(self.read_array()?),
            0xfe => u32::from_le_bytes(self.read_array()?) as u64,
            0xfd => u16::from_le_bytes(self.read_array()?) as u64,
            n => n as u64,
        };
        Ok(val)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, TspendError> {
        let len = self.read_var_int()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Read a count and make sure it cannot exceed what the remaining data
    /// could possibly hold (each element takes at least `min_elem_size`).
    fn read_count(&mut self, min_elem_size: usize) -> Result<usize, TspendError> {
        let count = self.read_var_int()? as usize;
        if count.saturating_mul(min_elem_size) > self.remaining() {
            return Err(TspendError::Encoding(format!(
                "element count {} exceeds remaining data",
                count
            )));
        }
        Ok(count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
    pub tree: i8,
}

impl OutPoint {
    /// The outpoint used by inputs that spend nothing (stakebase style).
    pub fn null() -> Self {
        Self {
            hash: Hash::ZERO,
            index: MAX_PREV_OUT_INDEX,
            tree: TX_TREE_REGULAR,
        }
    }

    pub fn is_null(&self) -> bool {
        self.hash.is_zero() && self.index == MAX_PREV_OUT_INDEX && self.tree == TX_TREE_REGULAR
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxIn {
    pub previous_out_point: OutPoint,
    pub sequence: u32,
    pub value_in: i64,
    pub block_height: u32,
    pub block_index: u32,
    #[serde(with = "hex_bytes")]
    pub signature_script: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOut {
    pub value: i64,
    pub version: u16,
    #[serde(with = "hex_bytes")]
    pub pk_script: Vec<u8>,
}

impl TxOut {
    pub fn new(value: i64, version: u16, pk_script: Vec<u8>) -> Self {
        Self {
            value,
            version,
            pk_script,
        }
    }

    pub fn serialize_size(&self) -> usize {
        8 + 2 + var_int_size(self.pk_script.len() as u64) + self.pk_script.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry: u32,
}

impl Transaction {
    pub fn new(version: u16) -> Self {
        Self {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            expiry: 0,
        }
    }

    fn write_prefix(&self, buf: &mut Vec<u8>) {
        write_var_int(buf, self.inputs.len() as u64);
        for txin in &self.inputs {
            buf.extend_from_slice(txin.previous_out_point.hash.as_bytes());
            buf.extend_from_slice(&txin.previous_out_point.index.to_le_bytes());
            buf.push(txin.previous_out_point.tree as u8);
            buf.extend_from_slice(&txin.sequence.to_le_bytes());
        }
        write_var_int(buf, self.outputs.len() as u64);
        for txout in &self.outputs {
            buf.extend_from_slice(&txout.value.to_le_bytes());
            buf.extend_from_slice(&txout.version.to_le_bytes());
            write_var_bytes(buf, &txout.pk_script);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&self.expiry.to_le_bytes());
    }

    /// Witness data. When `blank_scripts` is set every signature script is
    /// written as empty (used for signature hashing).
    fn write_witness(&self, buf: &mut Vec<u8>, blank_scripts: bool) {
        write_var_int(buf, self.inputs.len() as u64);
        for txin in &self.inputs {
            buf.extend_from_slice(&txin.value_in.to_le_bytes());
            buf.extend_from_slice(&txin.block_height.to_le_bytes());
            buf.extend_from_slice(&txin.block_index.to_le_bytes());
            if blank_scripts {
                write_var_int(buf, 0);
            } else {
                write_var_bytes(buf, &txin.signature_script);
            }
        }
    }

    fn version_word(&self, ser: SerType) -> [u8; 4] {
        (self.version as u32 | ((ser as u32) << 16)).to_le_bytes()
    }

    /// Full serialization (prefix and witness).
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialize_size());
        buf.extend_from_slice(&self.version_word(SerType::Full));
        self.write_prefix(&mut buf);
        self.write_witness(&mut buf, false);
        buf
    }

    /// Serialized prefix only, as hashed for the transaction id.
    pub fn serialize_prefix(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version_word(SerType::NoWitness));
        self.write_prefix(&mut buf);
        buf
    }

    /// Witness with blanked signature scripts, as committed to by signatures.
    pub fn serialize_witness_for_signing(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_witness(&mut buf, true);
        buf
    }

    pub fn serialize_size(&self) -> usize {
        let mut n = 4;
        n += var_int_size(self.inputs.len() as u64);
        n += self.inputs.len() * (HASH_SIZE + 4 + 1 + 4);
        n += var_int_size(self.outputs.len() as u64);
        n += self.outputs.iter().map(TxOut::serialize_size).sum::<usize>();
        n += 4 + 4;
        n += var_int_size(self.inputs.len() as u64);
        n += self
            .inputs
            .iter()
            .map(|i| {
                8 + 4
                    + 4
                    + var_int_size(i.signature_script.len() as u64)
                    + i.signature_script.len()
            })
            .sum::<usize>();
        n
    }

    /// Transaction id: hash of the prefix serialization.
    pub fn tx_hash(&self) -> Hash {
        sha256(&self.serialize_prefix())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, TspendError> {
        let mut r = Reader::new(data);
        let tx = Self::read_from(&mut r)?;
        if r.remaining() != 0 {
            return Err(TspendError::Encoding(format!(
                "{} trailing bytes after transaction",
                r.remaining()
            )));
        }
        Ok(tx)
    }

    pub fn from_hex(s: &str) -> Result<Self, TspendError> {
        Self::deserialize(&hex::decode(s.trim())?)
    }

    /// Read one fully serialized transaction.
    pub fn read_from(r: &mut Reader<'_>) -> Result<Self, TspendError> {
        let word = r.read_u32()?;
        let version = (word & 0xffff) as u16;
        let ser = word >> 16;
        if ser != SerType::Full as u32 {
            return Err(TspendError::Encoding(format!(
                "unsupported transaction serialization type {}",
                ser
            )));
        }

        let n_in = r.read_count(HASH_SIZE + 9)?;
        let mut inputs = Vec::with_capacity(n_in);
        for _ in 0..n_in {
            let hash = r.read_hash()?;
            let index = r.read_u32()?;
            let tree = r.read_u8()? as i8;
            let sequence = r.read_u32()?;
            inputs.push(TxIn {
                previous_out_point: OutPoint { hash, index, tree },
                sequence,
                value_in: 0,
                block_height: 0,
                block_index: 0,
                signature_script: Vec::new(),
            });
        }

        let n_out = r.read_count(11)?;
        let mut outputs = Vec::with_capacity(n_out);
        for _ in 0..n_out {
            let value = r.read_i64()?;
            let version = r.read_u16()?;
            let pk_script = r.read_var_bytes()?;
            outputs.push(TxOut::new(value, version, pk_script));
        }
        let lock_time = r.read_u32()?;
        let expiry = r.read_u32()?;

        let n_witness = r.read_count(17)?;
        if n_witness != inputs.len() {
            return Err(TspendError::Encoding(format!(
                "witness count {} does not match input count {}",
                n_witness,
                inputs.len()
            )));
        }
        for txin in inputs.iter_mut() {
            txin.value_in = r.read_i64()?;
            txin.block_height = r.read_u32()?;
            txin.block_index = r.read_u32()?;
            txin.signature_script = r.read_var_bytes()?;
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
            expiry,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Hash,
    pub merkle_root: Hash,
    pub stake_root: Hash,
    pub vote_bits: u16,
    pub final_state: [u8; 6],
    pub voters: u16,
    pub fresh_stake: u8,
    pub revocations: u8,
    pub pool_size: u32,
    pub bits: u32,
    pub sbits: i64,
    pub height: u32,
    pub size: u32,
    pub timestamp: u32,
    pub nonce: u32,
    #[serde(with = "hex_bytes")]
    pub extra_data: [u8; 32],
    pub stake_version: u32,
}

impl BlockHeader {
    /// A zeroed header at the given height pointing at `prev_block`.
    pub fn new(prev_block: Hash, height: u32) -> Self {
        Self {
            version: 1,
            prev_block,
            merkle_root: Hash::ZERO,
            stake_root: Hash::ZERO,
            vote_bits: 0,
            final_state: [0u8; 6],
            voters: 0,
            fresh_stake: 0,
            revocations: 0,
            pool_size: 0,
            bits: 0,
            sbits: 0,
            height,
            size: 0,
            timestamp: 0,
            nonce: 0,
            extra_data: [0u8; 32],
            stake_version: 0,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BLOCK_HEADER_SIZE);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(self.prev_block.as_bytes());
        buf.extend_from_slice(self.merkle_root.as_bytes());
        buf.extend_from_slice(self.stake_root.as_bytes());
        buf.extend_from_slice(&self.vote_bits.to_le_bytes());
        buf.extend_from_slice(&self.final_state);
        buf.extend_from_slice(&self.voters.to_le_bytes());
        buf.push(self.fresh_stake);
        buf.push(self.revocations);
        buf.extend_from_slice(&self.pool_size.to_le_bytes());
        buf.extend_from_slice(&self.bits.to_le_bytes());
        buf.extend_from_slice(&self.sbits.to_le_bytes());
        buf.extend_from_slice(&self.height.to_le_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        buf.extend_from_slice(&self.extra_data);
        buf.extend_from_slice(&self.stake_version.to_le_bytes());
        buf
    }

    pub fn block_hash(&self) -> Hash {
        sha256(&self.serialize())
    }

    pub fn read_from(r: &mut Reader<'_>) -> Result<Self, TspendError> {
        Ok(Self {
            version: r.read_u32()? as i32,
            prev_block: r.read_hash()?,
            merkle_root: r.read_hash()?,
            stake_root: r.read_hash()?,
            vote_bits: r.read_u16()?,
            final_state: r.read_array()?,
            voters: r.read_u16()?,
            fresh_stake: r.read_u8()?,
            revocations: r.read_u8()?,
            pool_size: r.read_u32()?,
            bits: r.read_u32()?,
            sbits: r.read_i64()?,
            height: r.read_u32()?,
            size: r.read_u32()?,
            timestamp: r.read_u32()?,
            nonce: r.read_u32()?,
            extra_data: r.read_array()?,
            stake_version: r.read_u32()?,
        })
    }

    pub fn from_hex(s: &str) -> Result<Self, TspendError> {
        let bytes = hex::decode(s.trim())?;
        if bytes.len() != BLOCK_HEADER_SIZE {
            return Err(TspendError::Encoding(format!(
                "block header is {} bytes, expected {}",
                bytes.len(),
                BLOCK_HEADER_SIZE
            )));
        }
        Self::read_from(&mut Reader::new(&bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub stake_transactions: Vec<Transaction>,
}

impl Block {
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = self.header.serialize();
        write_var_int(&mut buf, self.transactions.len() as u64);
        for tx in &self.transactions {
            buf.extend_from_slice(&tx.serialize());
        }
        write_var_int(&mut buf, self.stake_transactions.len() as u64);
        for tx in &self.stake_transactions {
            buf.extend_from_slice(&tx.serialize());
        }
        buf
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, TspendError> {
        let mut r = Reader::new(data);
        let header = BlockHeader::read_from(&mut r)?;
        let n_tx = r.read_count(4)?;
        let mut transactions = Vec::with_capacity(n_tx);
        for _ in 0..n_tx {
            transactions.push(Transaction::read_from(&mut r)?);
        }
        let n_stx = r.read_count(4)?;
        let mut stake_transactions = Vec::with_capacity(n_stx);
        for _ in 0..n_stx {
            stake_transactions.push(Transaction::read_from(&mut r)?);
        }
        if r.remaining() != 0 {
            return Err(TspendError::Encoding(format!(
                "{} trailing bytes after block",
                r.remaining()
            )));
        }
        Ok(Self {
            header,
            transactions,
            stake_transactions,
        })
    }

    pub fn from_hex(s: &str) -> Result<Self, TspendError> {
        Self::deserialize(&hex::decode(s.trim())?)
    }
}

/// Serialize byte buffers as hex strings in debug/JSON dumps.
mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer, T: AsRef<[u8]>>(
        bytes: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes.as_ref()))
    }
}

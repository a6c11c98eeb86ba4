//! Host-facing traits and the PoW consensus field wire codec.
//!
//! None of these types own any chain state; they describe what the host
//! validator must expose (`Block`, `BlockCache`, `SettingsSource`,
//! `ConsensusWriter`) and the one piece of wire format the core itself owns
//! (`ConsensusField`).

use std::str;

mod error;
pub use error::PowTypesError;

/// The tag a block's `consensus` field must start with to be considered PoW.
pub const POW_TAG: &str = "PoW";

/// A host-owned block, read-only from the core's perspective.
pub trait Block {
    fn block_num(&self) -> u64;
    fn header_signature(&self) -> &[u8];
    fn previous_block_id(&self) -> &[u8];
    fn signer_public_key(&self) -> &[u8];
    fn consensus(&self) -> &[u8];
}

/// Lookup of blocks by id. A miss is an ordinary, expected outcome (the block
/// may not have arrived yet), not an error.
pub trait BlockCache {
    type Block: Block;

    fn get(&self, id: &[u8]) -> Option<Self::Block>;
}

/// Typed access to the handful of on-chain settings this core reads.
///
/// Mirrors Sawtooth's settings-view-by-key model, narrowed to exactly the
/// keys this core needs; the host is responsible for applying each key's
/// documented default when the setting is unset.
pub trait SettingsSource {
    fn seconds_between_blocks(&self) -> u64;
    fn difficulty_adjustment_block_count(&self) -> u64;
    fn difficulty_tuning_block_count(&self) -> u64;
    /// `None` means the allow-list is unset (anyone may publish).
    fn valid_block_publishers(&self) -> Option<Vec<Vec<u8>>>;
}

/// A block under construction; the publisher writes the consensus field
/// through this trait. The host owns applying the signature afterward.
pub trait ConsensusWriter {
    fn set_consensus(&mut self, consensus: Vec<u8>);
}

/// The read surface of a block header still under construction.
///
/// A candidate doesn't have a `consensus` field worth reading yet (the
/// publisher is the one about to write it), so this is deliberately a
/// narrower trait than `Block` rather than requiring a placeholder value
/// for the field that hasn't been produced.
pub trait CandidateHeader {
    fn previous_block_id(&self) -> &[u8];
    fn signer_public_key(&self) -> &[u8];
}

/// A decoded `PoW:<difficulty>:<nonce>:<time>` consensus field.
///
/// `nonce` retains the exact ASCII bytes it was parsed from (or was built
/// from) rather than a re-serialized numeric value, since those bytes are
/// themselves digest input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusField {
    pub difficulty: u8,
    pub nonce: Vec<u8>,
    pub time: f64,
}

impl ConsensusField {
    pub fn new(difficulty: u8, nonce: Vec<u8>, time: f64) -> Self {
        Self { difficulty, nonce, time }
    }

    /// Parses a consensus byte string. Any malformed input yields an error;
    /// callers that need a bool (verification) should map this to `false`.
    pub fn parse(consensus: &[u8]) -> Result<Self, PowTypesError> {
        let parts: Vec<&[u8]> = consensus.splitn(4, |b| *b == b':').collect();
        let [tag, difficulty, nonce, time] = <[&[u8]; 4]>::try_from(parts.as_slice())
            .map_err(|_| PowTypesError::Malformed("expected 4 colon-separated segments"))?;

        if tag != POW_TAG.as_bytes() {
            return Err(PowTypesError::NotPow);
        }

        let difficulty_str =
            str::from_utf8(difficulty).map_err(|_| PowTypesError::Malformed("difficulty is not utf8"))?;
        let difficulty: u8 = difficulty_str
            .parse()
            .map_err(|_| PowTypesError::Malformed("difficulty out of range or non-numeric"))?;

        if nonce.is_empty() || !nonce.iter().all(u8::is_ascii_digit) {
            return Err(PowTypesError::Malformed("nonce is not a non-negative decimal integer"));
        }

        let time_str = str::from_utf8(time).map_err(|_| PowTypesError::Malformed("time is not utf8"))?;
        let time: f64 = time_str.parse().map_err(|_| PowTypesError::Malformed("time is not numeric"))?;

        Ok(Self { difficulty, nonce: nonce.to_vec(), time })
    }

    /// Serializes to `PoW:<difficulty>:<nonce>:<time>`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(POW_TAG.len() + self.nonce.len() + 24);
        out.extend_from_slice(POW_TAG.as_bytes());
        out.push(b':');
        out.extend_from_slice(self.difficulty.to_string().as_bytes());
        out.push(b':');
        out.extend_from_slice(&self.nonce);
        out.push(b':');
        out.extend_from_slice(format_time(self.time).as_bytes());
        out
    }

    /// True iff the raw consensus bytes carry the `PoW` tag, without fully
    /// decoding the remaining segments.
    pub fn is_pow(consensus: &[u8]) -> bool {
        consensus
            .splitn(4, |b| *b == b':')
            .next()
            .map(|tag| tag == POW_TAG.as_bytes())
            .unwrap_or(false)
    }
}

/// Encodes a nonce counter as the ASCII decimal bytes the digest and the
/// wire format both expect.
pub fn encode_nonce(nonce: u64) -> Vec<u8> {
    nonce.to_string().into_bytes()
}

fn format_time(time: f64) -> String {
    // Avoids Rust's default float formatting dropping the fractional part
    // for whole-second timestamps, which would still round-trip through
    // `f64::parse` but looks unlike a timestamp in logs and fixtures.
    if time.fract() == 0.0 {
        format!("{time:.1}")
    } else {
        time.to_string()
    }
}

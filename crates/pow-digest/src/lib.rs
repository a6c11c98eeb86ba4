//! Digest and leading-zero primitives shared by the difficulty regulator, the
//! solver worker, and block verification.
//!
//! The PoW digest is `SHA256(previous_block_id ++ signer_public_key ++ nonce_ascii)`
//! with no separators. Difficulty is measured as the number of leading zero *bits*
//! of that digest, viewed big-endian, not as a numeric target or ceiling.

use sha2::{Digest, Sha256};

/// Number of most-significant-bit zeros in `digest`, in `[0, 256]`.
///
/// Scans bytes from the start (most significant). The first non-zero byte
/// contributes its own leading-zero-bit count; every all-zero byte before it
/// contributes a full 8.
pub fn leading_zeros(digest: &[u8; 32]) -> u32 {
    let mut count = 0u32;
    for byte in digest {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

/// True iff `digest` satisfies a difficulty of `d` leading zero bits.
pub fn valid(digest: &[u8; 32], d: u32) -> bool {
    leading_zeros(digest) >= d
}

/// Builds the PoW digest from the raw id, public key, and ASCII nonce bytes.
///
/// Inputs are concatenated in this exact order with no separators, length
/// prefixes, or terminators.
pub fn build_digest(previous_block_id: &[u8], signer_public_key: &[u8], nonce_ascii: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(previous_block_id);
    hasher.update(signer_public_key);
    hasher.update(nonce_ascii);
    hasher.finalize().into()
}

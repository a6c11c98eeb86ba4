//! Validates a received block's consensus field: PoW tag present, the
//! difficulty floor honored, and the digest meeting the claimed difficulty.

use pow_difficulty::{DifficultyRegulator, RegulatorConfig};
use pow_digest::{build_digest, valid};
use pow_types::{Block, BlockCache, ConsensusField, SettingsSource};

/// Stateless aside from the regulator configuration; safe to share across
/// verification calls on different threads.
pub struct BlockVerifier {
    regulator: DifficultyRegulator,
}

impl BlockVerifier {
    pub fn new(config: RegulatorConfig) -> Self {
        Self { regulator: DifficultyRegulator::new(config) }
    }

    pub fn from_settings(settings: &dyn SettingsSource) -> Self {
        Self::new(RegulatorConfig::from_settings(settings))
    }

    /// `now` is only used by the lenient-time clause's "not from the future"
    /// sanity check in `validate_difficulty`, never to validate the block's
    /// own claimed difficulty against a live clock otherwise.
    pub fn verify_block<C: BlockCache>(&self, cache: &C, block: &C::Block, now: f64) -> bool {
        let Ok(field) = ConsensusField::parse(block.consensus()) else {
            return false;
        };

        let Some(prev) = cache.get(block.previous_block_id()) else {
            return false;
        };

        if ConsensusField::is_pow(prev.consensus()) {
            match self.regulator.validate_difficulty(cache, &prev, block, now) {
                Ok(true) => {}
                Ok(false) | Err(_) => return false,
            }
        }

        let digest = build_digest(block.previous_block_id(), block.signer_public_key(), &field.nonce);
        valid(&digest, field.difficulty as u32)
    }
}

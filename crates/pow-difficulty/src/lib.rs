//! Deterministic difficulty retargeting and per-block difficulty enforcement.
//!
//! Retargeting is a pure function of chain history: given the same block
//! store, every node computes the same expected difficulty for the same
//! block. Two windows apply depending on height: a coarse "tuning" window
//! (default every 100 blocks) and a fine "adjustment" window with a
//! hysteresis band (default every 10 blocks).

mod error;

pub use error::DifficultyError;

use pow_types::{Block, BlockCache, ConsensusField, SettingsSource};

/// Seconds of inter-block gap after which an honest miner may publish below
/// the currently expected difficulty rather than stall indefinitely.
const DIFFICULTY_ENFORCING_MULTIPLE: u64 = 30;

/// Genesis difficulty used whenever the immediate predecessor is not a PoW
/// block (the consensus-boundary case).
pub const INITIAL_DIFFICULTY: u8 = 22;

#[derive(Debug, Clone, PartialEq)]
pub struct RegulatorConfig {
    pub expected_block_interval: u64,
    pub difficulty_adjustment_block_count: u64,
    pub difficulty_tuning_block_count: u64,
    pub initial_difficulty: u8,
}

impl RegulatorConfig {
    /// Seconds of inter-block gap past which the lenient-time safety valve
    /// may apply.
    pub fn difficulty_enforcing_interval(&self) -> u64 {
        self.expected_block_interval * DIFFICULTY_ENFORCING_MULTIPLE
    }

    pub fn from_settings(settings: &dyn SettingsSource) -> Self {
        Self {
            expected_block_interval: settings.seconds_between_blocks(),
            difficulty_adjustment_block_count: settings.difficulty_adjustment_block_count(),
            difficulty_tuning_block_count: settings.difficulty_tuning_block_count(),
            initial_difficulty: INITIAL_DIFFICULTY,
        }
    }
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            expected_block_interval: 60,
            difficulty_adjustment_block_count: 10,
            difficulty_tuning_block_count: 100,
            initial_difficulty: INITIAL_DIFFICULTY,
        }
    }
}

enum Window {
    /// Coarse retarget: one-step move, no hysteresis band.
    Tuning,
    /// Fine retarget: hysteresis band of `expected/2 ..= expected*2`.
    Adjustment,
}

pub struct DifficultyRegulator {
    config: RegulatorConfig,
}

impl DifficultyRegulator {
    pub fn new(config: RegulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegulatorConfig {
        &self.config
    }

    /// Computes the difficulty a block extending `prev` is expected to meet.
    ///
    /// `now` is the wall-clock time at which the computation is performed
    /// (used only to measure elapsed time over the retargeting window, not
    /// to validate the candidate block's own timestamp).
    pub fn expected_difficulty<C: BlockCache>(
        &self,
        cache: &C,
        prev: &C::Block,
        now: f64,
    ) -> Result<u8, DifficultyError> {
        if !is_pow(prev) {
            return Ok(self.config.initial_difficulty);
        }

        let prev_field = parse_pow(prev)?;
        let height = prev.block_num();
        let current = prev_field.difficulty;

        if height % self.config.difficulty_tuning_block_count == 0 {
            return self.retarget(cache, prev, current, self.config.difficulty_tuning_block_count, now, Window::Tuning);
        }
        if height % self.config.difficulty_adjustment_block_count == 0 {
            return self.retarget(
                cache,
                prev,
                current,
                self.config.difficulty_adjustment_block_count,
                now,
                Window::Adjustment,
            );
        }
        Ok(current)
    }

    /// `true` iff `block.difficulty` meets the expected difficulty, or the
    /// lenient-time safety valve applies. `prev` must be a PoW block; callers
    /// skip this check entirely at a consensus boundary.
    pub fn validate_difficulty<C: BlockCache>(
        &self,
        cache: &C,
        prev: &C::Block,
        block: &C::Block,
        now: f64,
    ) -> Result<bool, DifficultyError> {
        let block_field = parse_pow(block)?;
        let expected = self.expected_difficulty(cache, prev, now)?;
        if block_field.difficulty >= expected {
            return Ok(true);
        }

        let prev_field = parse_pow(prev)?;
        let gap = block_field.time - prev_field.time;
        let lenient = block_field.time < now
            && gap > 0.0
            && gap >= self.config.difficulty_enforcing_interval() as f64;
        Ok(lenient)
    }

    fn retarget<C: BlockCache>(
        &self,
        cache: &C,
        prev: &C::Block,
        current: u8,
        window: u64,
        now: f64,
        kind: Window,
    ) -> Result<u8, DifficultyError> {
        let prev_field = parse_pow(prev)?;
        let mut oldest_time = prev_field.time;
        let mut visited: u64 = 1;
        let mut cursor_id = prev.previous_block_id().to_vec();

        while visited < window {
            let block = cache.get(&cursor_id).ok_or(DifficultyError::MissingPredecessor)?;
            if !is_pow(&block) {
                break;
            }
            let field = parse_pow(&block)?;
            oldest_time = field.time;
            cursor_id = block.previous_block_id().to_vec();
            visited += 1;
        }

        let taken = now - oldest_time;
        let expected = (visited * self.config.expected_block_interval) as f64;

        let next = match kind {
            Window::Tuning => {
                if taken < expected {
                    current.saturating_add(1)
                } else if taken > expected {
                    current.saturating_sub(1)
                } else {
                    current
                }
            }
            Window::Adjustment => {
                if taken < expected / 2.0 {
                    current.saturating_add(1)
                } else if taken > expected * 2.0 {
                    current.saturating_sub(1)
                } else {
                    current
                }
            }
        };

        tracing::debug!(visited, taken, expected, from = current, to = next, "difficulty retarget");
        Ok(next)
    }
}

fn is_pow<B: Block>(block: &B) -> bool {
    ConsensusField::is_pow(block.consensus())
}

fn parse_pow<B: Block>(block: &B) -> Result<ConsensusField, DifficultyError> {
    ConsensusField::parse(block.consensus()).map_err(DifficultyError::InvalidConsensusField)
}

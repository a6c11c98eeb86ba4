//! Cumulative-work fork choice over the common-ancestor suffix of two PoW
//! chain heads, with a difficulty-floor check on the challenger and a
//! time-deviation tie-break.

use primitive_types::U256;

use pow_difficulty::{DifficultyRegulator, RegulatorConfig};
use pow_types::{Block, BlockCache, ConsensusField, SettingsSource};

use crate::error::ForkError;

/// Blocks claiming to extend the chain more than 30 seconds into the future
/// are rejected outright, independent of work.
const MAX_FUTURE_SKEW_SECONDS: f64 = 30.0;

pub struct ForkResolver {
    regulator: DifficultyRegulator,
}

impl ForkResolver {
    pub fn new(config: RegulatorConfig) -> Self {
        Self { regulator: DifficultyRegulator::new(config) }
    }

    pub fn from_settings(settings: &dyn SettingsSource) -> Self {
        Self::new(RegulatorConfig::from_settings(settings))
    }

    /// Returns `Ok(true)` iff `new_head` is preferred over `cur_head`.
    ///
    /// A missing ancestor or a non-PoW block encountered mid-walk aborts the
    /// comparison and rejects the new fork (`Ok(false)`) so the host can
    /// retry once the rest of the chain has arrived. `new_head` not being a
    /// PoW block at all, or not being `cur_head`'s direct successor when
    /// `cur_head` is itself non-PoW, are host invariant violations and are
    /// reported as [`ForkError`].
    pub fn compare_forks<C: BlockCache>(&self, cache: &C, cur_head: &C::Block, new_head: &C::Block, now: f64) -> Result<bool, ForkError>
    where
        C::Block: Clone,
    {
        if !ConsensusField::is_pow(new_head.consensus()) {
            return Err(ForkError::NotPow);
        }
        let Ok(new_field) = ConsensusField::parse(new_head.consensus()) else {
            return Ok(false);
        };

        if new_field.time > now + MAX_FUTURE_SKEW_SECONDS {
            return Ok(false);
        }

        if !ConsensusField::is_pow(cur_head.consensus()) {
            return if new_head.previous_block_id() == cur_head.header_signature() {
                Ok(true)
            } else {
                Err(ForkError::NotPow)
            };
        }
        let Ok(cur_field) = ConsensusField::parse(cur_head.consensus()) else {
            return Ok(false);
        };

        let Some(new_tip) = align_height(cache, new_head, cur_head.block_num()) else {
            return Ok(false);
        };
        let Some(cur_tip) = align_height(cache, cur_head, new_head.block_num()) else {
            return Ok(false);
        };

        let Some((ancestor_id, ancestor_height, ancestor_time)) = find_common_ancestor(cache, new_tip, cur_tip) else {
            return Ok(false);
        };

        match self.verify_difficulties(cache, new_head, &ancestor_id, now) {
            Some(true) => {}
            Some(false) | None => return Ok(false),
        }

        let new_len = new_head.block_num().saturating_sub(ancestor_height);
        let cur_len = cur_head.block_num().saturating_sub(ancestor_height);

        let Some(new_work) = cumulative_work(cache, new_head, &ancestor_id) else {
            return Ok(false);
        };
        let Some(cur_work) = cumulative_work(cache, cur_head, &ancestor_id) else {
            return Ok(false);
        };

        if new_work > cur_work {
            tracing::debug!(?new_work, ?cur_work, "new fork wins on cumulative work");
            return Ok(true);
        }
        if new_work < cur_work {
            return Ok(false);
        }

        let new_av = if new_len > 0 { (new_field.time - ancestor_time) / new_len as f64 } else { 0.0 };
        let cur_av = if cur_len > 0 { (cur_field.time - ancestor_time) / cur_len as f64 } else { 0.0 };

        let prefer_new = new_av < cur_av;
        tracing::debug!(new_av, cur_av, prefer_new, "equal work, deciding on average block time");
        Ok(prefer_new)
    }

    /// Every PoW block from `head` down to (but not including) the ancestor
    /// must meet the difficulty floor its own predecessor implies; a single
    /// violation anywhere in the suffix rejects the whole fork.
    fn verify_difficulties<C: BlockCache>(&self, cache: &C, head: &C::Block, ancestor_id: &[u8], now: f64) -> Option<bool>
    where
        C::Block: Clone,
    {
        let mut block = head.clone();
        while block.header_signature() != ancestor_id {
            let prev = cache.get(block.previous_block_id())?;
            match self.regulator.validate_difficulty(cache, &prev, &block, now) {
                Ok(true) => {}
                Ok(false) => return Some(false),
                Err(_) => return None,
            }
            block = prev;
        }
        Some(true)
    }
}

fn work_of(difficulty: u8) -> U256 {
    U256::one() << (difficulty as usize)
}

/// Walks `head`'s tail back until its height matches `target_height`. Any
/// non-PoW ancestor encountered along the way is a fatal abort.
fn align_height<C: BlockCache>(cache: &C, head: &C::Block, target_height: u64) -> Option<C::Block>
where
    C::Block: Clone,
{
    let mut block = head.clone();
    while block.block_num() > target_height {
        let prev = cache.get(block.previous_block_id())?;
        if !ConsensusField::is_pow(prev.consensus()) {
            return None;
        }
        block = prev;
    }
    Some(block)
}

/// Steps both height-aligned cursors back in lock-step until their ids
/// match, returning the ancestor's id, height, and consensus time.
fn find_common_ancestor<C: BlockCache>(cache: &C, mut new_block: C::Block, mut cur_block: C::Block) -> Option<(Vec<u8>, u64, f64)>
where
    C::Block: Clone,
{
    loop {
        if new_block.header_signature() == cur_block.header_signature() {
            let field = ConsensusField::parse(new_block.consensus()).ok()?;
            return Some((new_block.header_signature().to_vec(), new_block.block_num(), field.time));
        }
        new_block = cache.get(new_block.previous_block_id())?;
        cur_block = cache.get(cur_block.previous_block_id())?;
        if !ConsensusField::is_pow(new_block.consensus()) || !ConsensusField::is_pow(cur_block.consensus()) {
            return None;
        }
    }
}

/// Sums `2^difficulty` over the suffix from `head` down to (not including)
/// `ancestor_id`.
fn cumulative_work<C: BlockCache>(cache: &C, head: &C::Block, ancestor_id: &[u8]) -> Option<U256>
where
    C::Block: Clone,
{
    let mut total = U256::zero();
    let mut block = head.clone();
    while block.header_signature() != ancestor_id {
        let field = ConsensusField::parse(block.consensus()).ok()?;
        total += work_of(field.difficulty);
        block = cache.get(block.previous_block_id())?;
    }
    Some(total)
}

//! Orchestrates the two solver workers and the difficulty regulator for one
//! local candidate block.
//!
//! `PRIMARY` races to solve the candidate currently being built; `PERFORMANCE`
//! keeps hashing the previously accepted job looking for a strictly better
//! result, in case the host decides to rebuild the same candidate. The two
//! swap roles in [`BlockPublisher::on_accepted`].

use std::cell::RefCell;
use std::thread;

use parking_lot::ReentrantMutex;

use pow_difficulty::{DifficultyRegulator, RegulatorConfig, INITIAL_DIFFICULTY};
use pow_solver::{Command, WorkerHandle, WorkerState};
use pow_types::{BlockCache, CandidateHeader, ConsensusField, ConsensusWriter, SettingsSource};

use crate::error::ConsensusError;

struct PublisherState {
    primary: WorkerHandle,
    performance: WorkerHandle,
    start_time: f64,
    valid_block_publishers: Option<Vec<Vec<u8>>>,
    remaining_time: f64,
    expected_block_interval: u64,
    difficulty_enforcing_interval: u64,
}

/// Owns `PRIMARY`/`PERFORMANCE` and the per-candidate fields the spec calls
/// out as shared mutable state, guarded by a single reentrant mutex:
/// `check_publish_block` calls into the same locked section that
/// `on_accepted` or `on_cancel_publish_block` might run from another thread,
/// and some of the publisher's own methods call each other while already
/// holding the lock.
pub struct BlockPublisher {
    state: ReentrantMutex<RefCell<PublisherState>>,
}

impl Default for BlockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPublisher {
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(PublisherState {
                primary: WorkerHandle::spawn(),
                performance: WorkerHandle::spawn(),
                start_time: 0.0,
                valid_block_publishers: None,
                remaining_time: 0.0,
                expected_block_interval: 60,
                difficulty_enforcing_interval: 60 * 30,
            })),
        }
    }

    /// Starts mining the candidate extending `header`. `now` becomes the
    /// job's id, tagging results so a later stale event can be told apart
    /// from a fresh one (see [`Self::check_publish_block`]).
    ///
    /// Returns `false` (not an error) if `PRIMARY` is still busy with a
    /// previous job, or if `header`'s predecessor isn't in `cache` yet.
    pub fn initialize_block<C: BlockCache, H: CandidateHeader>(
        &self,
        now: f64,
        cache: &C,
        settings: &dyn SettingsSource,
        header: &H,
    ) -> Result<bool, ConsensusError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();

        let Some(prev) = cache.get(header.previous_block_id()) else {
            return Ok(false);
        };

        if !matches!(state.primary.state(), WorkerState::Standby | WorkerState::Stopped { .. }) {
            return Ok(false);
        }

        let config = RegulatorConfig::from_settings(settings);
        state.expected_block_interval = config.expected_block_interval;
        state.difficulty_enforcing_interval = config.difficulty_enforcing_interval();
        state.valid_block_publishers = settings.valid_block_publishers();
        state.start_time = now;
        state.remaining_time = config.expected_block_interval as f64;

        let difficulty = if ConsensusField::is_pow(prev.consensus()) {
            let regulator = DifficultyRegulator::new(config);
            match regulator.expected_difficulty(cache, &prev, now) {
                Ok(difficulty) => difficulty,
                Err(error) => {
                    tracing::warn!(%error, "failed to compute expected difficulty, not initializing candidate");
                    return Ok(false);
                }
            }
        } else {
            INITIAL_DIFFICULTY
        };

        if let Err(error) = state.primary.send(Command::Start {
            id: now,
            target: difficulty,
            previous_block_id: header.previous_block_id().to_vec(),
            signer_public_key: header.signer_public_key().to_vec(),
        }) {
            tracing::warn!(%error, "failed to start PRIMARY, not initializing candidate");
            return Ok(false);
        }

        tracing::debug!(start_time = now, difficulty, "initialized PoW candidate");
        Ok(true)
    }

    /// Checks whether the candidate is ready to be claimed, writing the
    /// consensus field through `header` if so.
    ///
    /// Any `HASH`/`STOPPED` event carrying an id other than the current
    /// `start_time` is a stale result from a job this publisher already
    /// moved on from; it's ignored rather than applied.
    pub fn check_publish_block<H: CandidateHeader + ConsensusWriter>(
        &self,
        now: f64,
        header: &mut H,
    ) -> Result<bool, ConsensusError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();

        if let Some(allow_list) = state.valid_block_publishers.clone() {
            if !allow_list.iter().any(|key| key.as_slice() == header.signer_public_key()) {
                return Ok(false);
            }
        }

        let start_time = state.start_time;
        match state.primary.state() {
            WorkerState::Hash { id, difficulty, nonce } if id == start_time => {
                write_consensus(header, difficulty, nonce, start_time);
                state.performance.send(Command::Stop)?;
                tracing::debug!(start_time, difficulty, "PRIMARY found a hash, claiming candidate");
                Ok(true)
            }
            WorkerState::Stopped { .. } | WorkerState::Standby => Ok(false),
            WorkerState::Error(description) => Err(ConsensusError::WorkerProtocol(description)),
            // `Working`, or a `Hash`/`Stopped` event left over from a prior job.
            _ => {
                if now - start_time < state.difficulty_enforcing_interval as f64 {
                    return Ok(false);
                }
                state.primary.send(Command::Stop)?;
                loop {
                    match state.primary.state() {
                        WorkerState::Stopped { id, best_difficulty, best_nonce } => {
                            if id == start_time {
                                write_consensus(header, best_difficulty, best_nonce, start_time);
                            }
                            return Ok(true);
                        }
                        WorkerState::Error(description) => return Err(ConsensusError::WorkerProtocol(description)),
                        _ => thread::yield_now(),
                    }
                }
            }
        }
    }

    /// Called from the host's auxiliary thread. If `PERFORMANCE` found a
    /// strictly better hash than the committed one, writes it through
    /// `header` and asks the worker to keep searching for something better
    /// still.
    pub fn update_block<H: ConsensusWriter>(&self, header: &mut H) -> Result<bool, ConsensusError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let start_time = state.start_time;

        match state.performance.state() {
            WorkerState::Hash { id, difficulty, nonce } if id == start_time => {
                write_consensus(header, difficulty, nonce, start_time);
                state.performance.send(Command::Swap)?;
                Ok(true)
            }
            WorkerState::Error(description) => Err(ConsensusError::WorkerProtocol(description)),
            _ => Ok(false),
        }
    }

    /// Swaps `PRIMARY`/`PERFORMANCE`: the worker that had been racing for the
    /// just-accepted block continues as the new speculative `PERFORMANCE`
    /// search, and the one that had been searching for an improvement
    /// becomes the new `PRIMARY`. Calling this twice restores the original
    /// assignment.
    pub fn on_accepted(&self) -> Result<(), ConsensusError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        std::mem::swap(&mut state.primary, &mut state.performance);
        state.primary.send(Command::Swap)?;
        state.performance.send(Command::Swap)?;
        Ok(())
    }

    /// Stops both workers and blocks until each acknowledges, the one
    /// bounded-wait operation outside the hot path.
    pub fn on_cancel_publish_block(&self) -> Result<(), ConsensusError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.primary.send(Command::Stop)?;
        state.performance.send(Command::Stop)?;
        wait_for_stopped(&mut state.primary)?;
        wait_for_stopped(&mut state.performance)?;
        Ok(())
    }

    /// No post-processing of the header is required; the host applies the
    /// signature.
    pub fn finalize_block(&self) -> bool {
        true
    }

    pub fn get_remaining_time(&self, now: f64) -> f64 {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let remaining = (state.expected_block_interval as f64 - (now - state.start_time)).max(0.0);
        state.remaining_time = remaining;
        remaining
    }
}

fn write_consensus(header: &mut impl ConsensusWriter, difficulty: u8, nonce: Vec<u8>, start_time: f64) {
    let field = ConsensusField::new(difficulty, nonce, start_time);
    header.set_consensus(field.serialize());
}

fn wait_for_stopped(handle: &mut WorkerHandle) -> Result<(), ConsensusError> {
    loop {
        match handle.state() {
            WorkerState::Stopped { .. } | WorkerState::Standby => return Ok(()),
            WorkerState::Error(description) => return Err(ConsensusError::WorkerProtocol(description)),
            _ => thread::yield_now(),
        }
    }
}

/// Commands the publisher sends to a solver worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Begin a new job. Valid only while the worker is in standby.
    Start {
        id: f64,
        target: u8,
        previous_block_id: Vec<u8>,
        signer_public_key: Vec<u8>,
    },
    /// Abandon the current job and report the best result seen so far.
    Stop,
    /// Treat the current best-seen hash as consumed; keep searching the
    /// same job for a strictly better one.
    Swap,
}

/// Events a solver worker reports back to the publisher.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Acknowledges a `Start` or `Swap`; a job is now in progress.
    Working,
    /// A nonce meeting the current target was found.
    Hash { id: f64, difficulty: u8, nonce: Vec<u8> },
    /// Acknowledges a `Stop`; the worker is back in standby.
    Stopped { id: f64, best_difficulty: u8, best_nonce: Vec<u8> },
    /// The worker hit a protocol violation and can no longer continue.
    Error(String),
}

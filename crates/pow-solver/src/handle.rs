use std::cell::RefCell;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::error::SolverError;
use crate::protocol::{Command, Event};
use crate::worker;

/// The worker's state as last observed by the publisher. Read-only snapshot
/// produced by draining the event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerState {
    Standby,
    Working,
    Hash { id: f64, difficulty: u8, nonce: Vec<u8> },
    Stopped { id: f64, best_difficulty: u8, best_nonce: Vec<u8> },
    Error(String),
}

impl From<Event> for WorkerState {
    fn from(event: Event) -> Self {
        match event {
            Event::Working => WorkerState::Working,
            Event::Hash { id, difficulty, nonce } => WorkerState::Hash { id, difficulty, nonce },
            Event::Stopped { id, best_difficulty, best_nonce } => {
                WorkerState::Stopped { id, best_difficulty, best_nonce }
            }
            Event::Error(description) => WorkerState::Error(description),
        }
    }
}

/// A handle to one solver thread. State is lazy: every read drains all
/// pending events and remembers only the most recent one, matching the
/// worker's own event-driven command loop.
pub struct WorkerHandle {
    command_tx: Option<Sender<Command>>,
    event_rx: Receiver<Event>,
    state: RefCell<WorkerState>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn() -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("pow-solver".into())
            .spawn(move || worker::run(command_rx, event_tx))
            .expect("failed to spawn solver thread");

        Self {
            command_tx: Some(command_tx),
            event_rx,
            state: RefCell::new(WorkerState::Standby),
            thread: Some(thread),
        }
    }

    pub fn send(&self, command: Command) -> Result<(), SolverError> {
        self.command_tx
            .as_ref()
            .ok_or(SolverError::WorkerGone)?
            .send(command)
            .map_err(|_| SolverError::WorkerGone)
    }

    /// Drains all pending events non-blockingly and returns the most recent
    /// resulting state.
    pub fn state(&self) -> WorkerState {
        let mut state = self.state.borrow_mut();
        while let Ok(event) = self.event_rx.try_recv() {
            tracing::trace!(?event, "solver event");
            *state = event.into();
        }
        state.clone()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(tx) = &self.command_tx {
            let _ = tx.send(Command::Stop);
        }
        // Dropping the sender unblocks a worker parked in standby, and is
        // observed as a disconnect by a worker mid-job at its next poll.
        self.command_tx = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

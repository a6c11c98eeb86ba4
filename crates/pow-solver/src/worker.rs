use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use pow_digest::{build_digest, leading_zeros};
use pow_types::encode_nonce;

use crate::protocol::{Command, Event};

/// Runs on a dedicated OS thread for the lifetime of a `WorkerHandle`.
/// Alternates between standby (blocked on the next command) and hashing a
/// job, polling the command channel non-blockingly between nonce trials.
pub(crate) fn run(commands: Receiver<Command>, events: Sender<Event>) {
    loop {
        match commands.recv() {
            Ok(Command::Start { id, target, previous_block_id, signer_public_key }) => {
                if events.send(Event::Working).is_err() {
                    return;
                }
                if !run_job(id, target, previous_block_id, signer_public_key, &commands, &events) {
                    return;
                }
            }
            Ok(Command::Stop) | Ok(Command::Swap) => {
                // No-op in standby, silently acknowledged.
            }
            Err(_) => return,
        }
    }
}

/// Hashes one job to completion. Returns `false` once the channel has
/// disconnected, signaling the caller to shut the thread down.
fn run_job(
    id: f64,
    mut target: u8,
    previous_block_id: Vec<u8>,
    signer_public_key: Vec<u8>,
    commands: &Receiver<Command>,
    events: &Sender<Event>,
) -> bool {
    let mut nonce: u64 = rand::random();
    let mut best_difficulty: u8 = 0;
    let mut best_nonce: Vec<u8> = encode_nonce(nonce);

    loop {
        match commands.try_recv() {
            Ok(Command::Stop) => {
                return events
                    .send(Event::Stopped { id, best_difficulty, best_nonce: best_nonce.clone() })
                    .is_ok();
            }
            Ok(Command::Swap) => {
                target = target.max(best_difficulty.saturating_add(1));
                if events.send(Event::Working).is_err() {
                    return false;
                }
                continue;
            }
            Ok(Command::Start { .. }) => {
                events.send(Event::Error("unexpected START while a job is in progress".into())).ok();
                return true;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return false,
        }

        let nonce_ascii = encode_nonce(nonce);
        let digest = build_digest(&previous_block_id, &signer_public_key, &nonce_ascii);
        let zeros = leading_zeros(&digest).min(255);

        if zeros as u8 > best_difficulty {
            best_difficulty = zeros as u8;
            best_nonce = nonce_ascii.clone();
        }

        if zeros >= target as u32 {
            if events.send(Event::Hash { id, difficulty: target, nonce: nonce_ascii }).is_err() {
                return false;
            }
            target = (zeros + 1).min(255) as u8;
            nonce = rand::random();
        } else {
            nonce = nonce.wrapping_add(1);
        }
    }
}

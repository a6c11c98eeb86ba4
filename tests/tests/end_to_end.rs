//! Cross-crate end-to-end scenarios from the consensus core's spec: mining a
//! block through `BlockPublisher` and accepting it through `BlockVerifier`,
//! retargeting across a real chain, the lenient-time safety valve, and fork
//! choice by cumulative work.

mod common;

use std::time::Duration;

use common::{genesis, pow_block, FakeCache, FakeHeader, FakeSettings};

use pow_consensus::{BlockPublisher, BlockVerifier, ForkResolver};
use pow_difficulty::RegulatorConfig;
use pow_digest::{build_digest, leading_zeros};
use pow_types::ConsensusField;

#[test]
fn mines_and_verifies_a_genesis_successor() {
    let publisher = BlockPublisher::new();
    let mut cache = FakeCache::default();
    cache.insert(genesis());
    let settings = FakeSettings::default();

    let mut header =
        FakeHeader { previous_block_id: b"genesis".to_vec(), signer_public_key: b"miner".to_vec(), consensus: Vec::new() };

    assert!(publisher.initialize_block(1_700_000_000.0, &cache, &settings, &header).unwrap());

    // INITIAL_DIFFICULTY (22) averages ~4M hash attempts; generous but
    // bounded so a slow CI runner doesn't make this test flaky.
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    loop {
        if publisher.check_publish_block(1_700_000_000.0, &mut header).unwrap() {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "mining did not complete in time");
        std::thread::sleep(Duration::from_millis(5));
    }

    let field = ConsensusField::parse(&header.consensus).unwrap();
    assert_eq!(field.difficulty, 22); // INITIAL_DIFFICULTY, prev is non-PoW

    let mut accepted = genesis();
    accepted.block_num = 1;
    accepted.id = b"accepted".to_vec();
    accepted.previous_block_id = b"genesis".to_vec();
    accepted.signer = b"miner".to_vec();
    accepted.consensus = header.consensus.clone();
    cache.insert(accepted.clone());

    let verifier = BlockVerifier::from_settings(&settings);
    assert!(verifier.verify_block(&cache, &accepted, 1_700_000_100.0));
}

#[test]
fn retargeting_up_then_verifying_against_the_new_floor() {
    // 100 blocks spaced 30s apart against a 60s expected interval: strictly
    // faster than expected, so the coarse window raises difficulty by one.
    let mut cache = FakeCache::default();
    cache.insert(genesis());

    let mut prev_id = "genesis".to_string();
    let mut time = 0.0;
    for i in 1..=100u64 {
        time += 30.0;
        let id = format!("b{i}");
        cache.insert(pow_block(i, &id, &prev_id, "miner", 22, time));
        prev_id = id;
    }

    let config = RegulatorConfig { difficulty_tuning_block_count: 100, ..Default::default() };
    let verifier = BlockVerifier::new(config);

    let nonce = {
        let mut n = 0u64;
        loop {
            let ascii = pow_types::encode_nonce(n);
            let digest = build_digest(b"b100", b"miner", &ascii);
            if leading_zeros(&digest) >= 23 {
                break ascii;
            }
            n += 1;
        }
    };
    let successor = pow_block(101, "b101", "b100", "miner", 23, time + 30.0);
    let mut with_right_nonce = successor.clone();
    with_right_nonce.consensus = ConsensusField::new(23, nonce, time + 30.0).serialize();
    cache.insert(with_right_nonce.clone());

    assert!(verifier.verify_block(&cache, &with_right_nonce, time + 200.0));

    // A successor still claiming the old difficulty (22) fails the floor.
    let stale_nonce = {
        let mut n = 0u64;
        loop {
            let ascii = pow_types::encode_nonce(n);
            let digest = build_digest(b"b100", b"miner", &ascii);
            if leading_zeros(&digest) >= 22 {
                break ascii;
            }
            n += 1;
        }
    };
    let mut stale = successor;
    stale.consensus = ConsensusField::new(22, stale_nonce, time + 30.0).serialize();
    assert!(!verifier.verify_block(&cache, &stale, time + 200.0));
}

#[test]
fn lenient_time_clause_admits_an_under_target_block_after_a_long_gap() {
    let mut cache = FakeCache::default();
    cache.insert(genesis());
    cache.insert(pow_block(1, "b1", "genesis", "miner", 22, 1_000.0));

    let verifier = BlockVerifier::new(RegulatorConfig::default());

    // Gap of 2000s > 30 * 60s enforcing interval, claimed difficulty far
    // below the floor, block time safely in the past.
    let nonce = {
        let mut n = 0u64;
        loop {
            let ascii = pow_types::encode_nonce(n);
            let digest = build_digest(b"b1", b"miner", &ascii);
            if leading_zeros(&digest) >= 5 {
                break ascii;
            }
            n += 1;
        }
    };
    let mut lenient = pow_block(2, "b2", "b1", "miner", 5, 3_000.0);
    lenient.consensus = ConsensusField::new(5, nonce, 3_000.0).serialize();
    cache.insert(lenient.clone());

    assert!(verifier.verify_block(&cache, &lenient, 3_001.0));
}

#[test]
fn fork_choice_prefers_more_cumulative_work_over_a_longer_chain() {
    let mut cache = FakeCache::default();
    cache.insert(genesis());
    let ancestor = pow_block(50, "a", "genesis", "miner", 22, 0.0);
    cache.insert(ancestor.clone());

    let mut prev = "a".to_string();
    let mut time = 0.0;
    for i in 0..5 {
        time += 60.0;
        let id = format!("cur{i}");
        cache.insert(pow_block(51 + i, &id, &prev, "miner", 22, time));
        prev = id;
    }
    let cur_head = cache.0.get(prev.as_bytes()).unwrap().clone();

    let mut prev = "a".to_string();
    let mut time = 0.0;
    for i in 0..3 {
        time += 60.0;
        let id = format!("new{i}");
        cache.insert(pow_block(51 + i, &id, &prev, "miner", 24, time));
        prev = id;
    }
    let new_head = cache.0.get(prev.as_bytes()).unwrap().clone();

    let resolver = ForkResolver::new(RegulatorConfig::default());
    assert!(resolver.compare_forks(&cache, &cur_head, &new_head, 10_000.0).unwrap());
}

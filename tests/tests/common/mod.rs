//! In-memory fakes of the host-facing traits in `pow_types`, shared by the
//! end-to-end scenario tests.

use std::collections::HashMap;

use pow_types::{Block, BlockCache, CandidateHeader, ConsensusField, ConsensusWriter, SettingsSource};

#[derive(Clone)]
pub struct FakeBlock {
    pub block_num: u64,
    pub id: Vec<u8>,
    pub previous_block_id: Vec<u8>,
    pub signer: Vec<u8>,
    pub consensus: Vec<u8>,
}

impl Block for FakeBlock {
    fn block_num(&self) -> u64 {
        self.block_num
    }
    fn header_signature(&self) -> &[u8] {
        &self.id
    }
    fn previous_block_id(&self) -> &[u8] {
        &self.previous_block_id
    }
    fn signer_public_key(&self) -> &[u8] {
        &self.signer
    }
    fn consensus(&self) -> &[u8] {
        &self.consensus
    }
}

#[derive(Default)]
pub struct FakeCache(pub HashMap<Vec<u8>, FakeBlock>);

impl BlockCache for FakeCache {
    type Block = FakeBlock;
    fn get(&self, id: &[u8]) -> Option<FakeBlock> {
        self.0.get(id).cloned()
    }
}

impl FakeCache {
    pub fn insert(&mut self, block: FakeBlock) {
        self.0.insert(block.id.clone(), block);
    }
}

pub struct FakeSettings {
    pub seconds_between_blocks: u64,
    pub difficulty_adjustment_block_count: u64,
    pub difficulty_tuning_block_count: u64,
    pub valid_block_publishers: Option<Vec<Vec<u8>>>,
}

impl Default for FakeSettings {
    fn default() -> Self {
        Self {
            seconds_between_blocks: 60,
            difficulty_adjustment_block_count: 10,
            difficulty_tuning_block_count: 100,
            valid_block_publishers: None,
        }
    }
}

impl SettingsSource for FakeSettings {
    fn seconds_between_blocks(&self) -> u64 {
        self.seconds_between_blocks
    }
    fn difficulty_adjustment_block_count(&self) -> u64 {
        self.difficulty_adjustment_block_count
    }
    fn difficulty_tuning_block_count(&self) -> u64 {
        self.difficulty_tuning_block_count
    }
    fn valid_block_publishers(&self) -> Option<Vec<Vec<u8>>> {
        self.valid_block_publishers.clone()
    }
}

pub struct FakeHeader {
    pub previous_block_id: Vec<u8>,
    pub signer_public_key: Vec<u8>,
    pub consensus: Vec<u8>,
}

impl CandidateHeader for FakeHeader {
    fn previous_block_id(&self) -> &[u8] {
        &self.previous_block_id
    }
    fn signer_public_key(&self) -> &[u8] {
        &self.signer_public_key
    }
}

impl ConsensusWriter for FakeHeader {
    fn set_consensus(&mut self, consensus: Vec<u8>) {
        self.consensus = consensus;
    }
}

pub fn genesis() -> FakeBlock {
    FakeBlock {
        block_num: 0,
        id: b"genesis".to_vec(),
        previous_block_id: b"".to_vec(),
        signer: b"genesis-signer".to_vec(),
        consensus: b"Genesis".to_vec(),
    }
}

pub fn pow_block(num: u64, id: &str, prev: &str, signer: &str, difficulty: u8, time: f64) -> FakeBlock {
    FakeBlock {
        block_num: num,
        id: id.as_bytes().to_vec(),
        previous_block_id: prev.as_bytes().to_vec(),
        signer: signer.as_bytes().to_vec(),
        consensus: ConsensusField::new(difficulty, pow_types::encode_nonce(0), time).serialize(),
    }
}

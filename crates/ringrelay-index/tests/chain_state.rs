//! Index behaviour observed through the public API: round-trips, cursor
//! semantics, transaction membership, and fork handling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ringrelay_core::{ObservedBlock, B256};
use ringrelay_index::{
    BlockIndex, BlockRecorder, BlockSource, ChainStateIndex, ForkStatus, IndexConfig, IndexError,
    MemoryKvStore, Reconciler, RollbackRange,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn h(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

fn block(number: u64, hash: u8, parent: u8) -> ObservedBlock {
    ObservedBlock {
        number,
        hash: h(hash),
        parent_hash: h(parent),
        timestamp: number * 15,
        transactions: vec![h(hash.wrapping_add(0x80))],
    }
}

fn memory_index() -> ChainStateIndex {
    ChainStateIndex::new(Arc::new(MemoryKvStore::new()), IndexConfig::default())
}

/// Node view of headers the index may not have seen.
#[derive(Default)]
struct FakeNode {
    headers: HashMap<B256, BlockIndex>,
}

impl FakeNode {
    fn with(mut self, b: &ObservedBlock) -> Self {
        self.headers.insert(b.hash, BlockIndex::from(b));
        self
    }
}

#[async_trait]
impl BlockSource for FakeNode {
    async fn block_by_hash(&self, hash: &B256) -> Result<Option<BlockIndex>, IndexError> {
        Ok(self.headers.get(hash).copied())
    }
}

#[derive(Default)]
struct RecordingReconciler {
    ranges: Mutex<Vec<RollbackRange>>,
}

#[async_trait]
impl Reconciler for RecordingReconciler {
    async fn roll_back(&self, range: RollbackRange) -> Result<(), IndexError> {
        self.ranges.lock().unwrap().push(range);
        Ok(())
    }
}

// ─── Index operations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn save_block_round_trips_header() {
    let idx = memory_index();
    let b = block(42, 0x42, 0x41);
    idx.save_block(&b).await.unwrap();

    let rec = idx.get_block_index(&b.hash).await.unwrap();
    assert_eq!(rec, BlockIndex { number: 42, hash: b.hash, parent_hash: b.parent_hash });
    assert_eq!(idx.get_block_number().await.unwrap(), 42);
}

#[tokio::test]
async fn lower_block_number_still_wins() {
    let idx = memory_index();
    let b100 = block(100, 0x10, 0x0f);
    let b99 = block(99, 0x09, 0x08);

    idx.save_block(&b100).await.unwrap();
    idx.save_block(&b99).await.unwrap();

    assert_eq!(idx.get_block_number().await.unwrap(), 99);
    assert_eq!(idx.get_block_index(&b100.hash).await.unwrap().number, 100);
    assert_eq!(idx.get_block_index(&b99.hash).await.unwrap().number, 99);
}

#[tokio::test]
async fn find_transaction_false_versus_error() {
    let idx = memory_index();
    let bh = h(0x01);
    idx.save_transactions(&bh, &[h(0xa1), h(0xa2)]).await.unwrap();

    assert!(idx.find_transaction(&bh, &h(0xa2)).await.unwrap());
    assert!(!idx.find_transaction(&bh, &h(0xff)).await.unwrap());

    let err = idx.find_transaction(&h(0x02), &h(0xa1)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn parent_lookup_miss_is_not_found() {
    let idx = memory_index();
    idx.save_block(&block(1, 0x01, 0x00)).await.unwrap();
    let err = idx.get_block_index(&h(0x77)).await.unwrap_err();
    assert!(matches!(err, IndexError::NotFound { .. }));
}

// ─── Fork handling ────────────────────────────────────────────────────────────

#[tokio::test]
async fn recorder_flags_competing_block_at_head() {
    let reconciler = Arc::new(RecordingReconciler::default());
    let mut rec = BlockRecorder::new(memory_index(), Arc::new(FakeNode::default()))
        .with_reconciler(reconciler.clone());

    assert_eq!(rec.record(&block(1, 0x01, 0x00)).await.unwrap(), ForkStatus::ColdStart);
    assert_eq!(rec.record(&block(2, 0x02, 0x01)).await.unwrap(), ForkStatus::Canonical);
    assert_eq!(rec.record(&block(3, 0x03, 0x02)).await.unwrap(), ForkStatus::Canonical);

    // competing block 3' on top of block 2
    let status = rec.record(&block(3, 0x33, 0x02)).await.unwrap();
    let expected = RollbackRange { after: 2, through: 3 };
    match status {
        ForkStatus::Fork { ancestor, rollback } => {
            assert_eq!(ancestor.unwrap().hash, h(0x02));
            assert_eq!(rollback, expected);
        }
        other => panic!("expected fork, got {other:?}"),
    }
    assert_eq!(*reconciler.ranges.lock().unwrap(), vec![expected]);

    // the new branch continues normally
    assert_eq!(rec.record(&block(4, 0x44, 0x33)).await.unwrap(), ForkStatus::Canonical);
    assert_eq!(rec.index().get_block_number().await.unwrap(), 4);
    assert!(rec.index().find_transaction(&h(0x44), &h(0xc4)).await.unwrap());
}

#[tokio::test]
async fn switching_back_to_an_earlier_branch_is_a_fork() {
    let reconciler = Arc::new(RecordingReconciler::default());
    let mut rec = BlockRecorder::new(memory_index(), Arc::new(FakeNode::default()))
        .with_reconciler(reconciler.clone());

    let b99 = block(99, 0x99, 0x98);
    let b100a = block(100, 0xa0, 0x99);
    let b100b = block(100, 0xb0, 0x99);
    let b101a = block(101, 0xa1, 0xa0);

    assert_eq!(rec.record(&b99).await.unwrap(), ForkStatus::ColdStart);
    assert_eq!(rec.record(&b100a).await.unwrap(), ForkStatus::Canonical);
    assert!(rec.record(&b100b).await.unwrap().is_fork());

    // 100a is indexed but no longer on the head's chain
    match rec.record(&b101a).await.unwrap() {
        ForkStatus::Fork { ancestor, rollback } => {
            assert_eq!(ancestor.unwrap().hash, b99.hash);
            assert_eq!(rollback, RollbackRange { after: 99, through: 100 });
        }
        other => panic!("expected fork, got {other:?}"),
    }
    assert_eq!(
        *reconciler.ranges.lock().unwrap(),
        vec![RollbackRange { after: 99, through: 100 }; 2]
    );

    let idx = rec.index();
    assert_eq!(idx.get_canonical_hash(100).await.unwrap(), b100a.hash);
    assert_eq!(idx.get_canonical_hash(101).await.unwrap(), b101a.hash);
    assert_eq!(rec.record(&block(102, 0xa2, 0xa1)).await.unwrap(), ForkStatus::Canonical);
}

#[tokio::test]
async fn deep_fork_walks_back_through_node() {
    let c2 = block(2, 0xc2, 0x01);
    let c3 = block(3, 0xc3, 0xc2);
    let node = FakeNode::default().with(&c2).with(&c3);

    let reconciler = Arc::new(RecordingReconciler::default());
    let mut rec = BlockRecorder::new(memory_index(), Arc::new(node)).with_reconciler(reconciler.clone());
    for b in [block(1, 0x01, 0x00), block(2, 0x02, 0x01), block(3, 0x03, 0x02)] {
        rec.record(&b).await.unwrap();
    }

    let status = rec.record(&block(4, 0xc4, 0xc3)).await.unwrap();
    assert!(status.is_fork());
    assert_eq!(*reconciler.ranges.lock().unwrap(), vec![RollbackRange { after: 1, through: 3 }]);
}

#[tokio::test]
async fn gap_ahead_of_cursor_is_canonical() {
    let d4 = block(4, 0xd4, 0x03);
    let idx = memory_index();
    for b in [block(2, 0x02, 0x01), block(3, 0x03, 0x02)] {
        idx.save_block(&b).await.unwrap();
    }

    let node = FakeNode::default().with(&d4);
    let status = idx.check_parent(&block(5, 0xd5, 0xd4), &node).await.unwrap();
    assert_eq!(status, ForkStatus::Canonical);
}

#[tokio::test]
async fn unknown_ancestor_on_node_is_a_source_error() {
    let idx = memory_index();
    idx.save_block(&block(1, 0x01, 0x00)).await.unwrap();

    let err = idx
        .check_parent(&block(5, 0xe5, 0xe4), &FakeNode::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Source { .. }));
}

#[tokio::test]
async fn no_ancestor_within_depth() {
    let config = IndexConfig { max_reorg_depth: 2, ..IndexConfig::default() };
    let idx = ChainStateIndex::new(Arc::new(MemoryKvStore::new()), config);
    idx.save_block(&block(10, 0x0a, 0x09)).await.unwrap();

    let node = FakeNode::default()
        .with(&block(10, 0xfa, 0xf9))
        .with(&block(9, 0xf9, 0xf8))
        .with(&block(8, 0xf8, 0xf7));

    match idx.check_parent(&block(11, 0xfb, 0xfa), &node).await.unwrap() {
        ForkStatus::Fork { ancestor: None, rollback } => {
            assert_eq!(rollback, RollbackRange { after: 8, through: 10 });
        }
        other => panic!("expected fork without ancestor, got {other:?}"),
    }
}

#[tokio::test]
async fn recorder_task_drains_channel() {
    let rec = BlockRecorder::new(memory_index(), Arc::new(FakeNode::default()));
    let index = rec.index().clone();
    let (tx, rx) = tokio::sync::mpsc::channel(4);
    let task = tokio::spawn(rec.run(rx));

    for b in [block(1, 0x01, 0x00), block(2, 0x02, 0x01)] {
        tx.send(b).await.unwrap();
    }
    drop(tx);

    assert_eq!(task.await.unwrap(), 2);
    assert_eq!(index.get_block_number().await.unwrap(), 2);
}

// ─── SQLite backend ───────────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_backend_keeps_index_semantics() {
    use ringrelay_index::sqlite::SqliteKvStore;

    let store = SqliteKvStore::in_memory().await.unwrap();
    let idx = ChainStateIndex::new(Arc::new(store), IndexConfig::default());

    let b = block(100, 0x10, 0x0f);
    idx.save_block(&b).await.unwrap();
    idx.save_block(&block(99, 0x09, 0x08)).await.unwrap();
    idx.save_transactions(&b.hash, &b.transactions).await.unwrap();

    assert_eq!(idx.get_block_number().await.unwrap(), 99);
    assert_eq!(idx.get_block_index(&b.hash).await.unwrap().number, 100);
    assert!(!idx.find_transaction(&b.hash, &h(0x00)).await.unwrap());
    assert!(idx.get_block_index(&h(0x55)).await.unwrap_err().is_not_found());
}

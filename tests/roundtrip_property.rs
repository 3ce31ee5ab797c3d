//! Property-based tests for backing store correctness
//!
//! Drives random offset-addressed write sequences against each store
//! variant and checks the results against a plain in-memory model.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use relayfs::{
    BackingStore, DiskStore, KvStore, MemoryKv, MemoryStore, OpenMode, SyncBridge,
};
use tempfile::TempDir;

/// Run a write sequence and verify reads and sizes against a model.
/// `path` must denote a file whose initial content is empty.
fn check_against_model(
    store: &mut dyn BackingStore,
    path: &str,
    ops: &[(u64, Vec<u8>)],
) -> Result<(), TestCaseError> {
    let fd = store.open(path, OpenMode::read_write()).unwrap();
    let mut model: Vec<u8> = Vec::new();

    for (offset, data) in ops {
        let written = store.pwrite(fd, data, *offset).unwrap();
        prop_assert_eq!(written, data.len());

        let end = *offset as usize + data.len();
        if end > model.len() {
            model.resize(end, 0);
        }
        model[*offset as usize..end].copy_from_slice(data);

        // size == max over all (offset + length) seen so far
        prop_assert_eq!(store.size(fd).unwrap(), model.len() as u64);

        // Immediate read-back of the span just written
        let mut buf = vec![0u8; data.len()];
        let read = store.pread(fd, &mut buf, *offset).unwrap();
        prop_assert_eq!(read, data.len());
        prop_assert_eq!(&buf, data);
    }

    // Full-content comparison, then a read past end-of-file
    let mut contents = vec![0u8; model.len()];
    prop_assert_eq!(store.pread(fd, &mut contents, 0).unwrap(), model.len());
    prop_assert_eq!(&contents, &model);

    let mut past = [0u8; 32];
    prop_assert_eq!(store.pread(fd, &mut past, model.len() as u64).unwrap(), 0);

    store.close(fd).unwrap();
    Ok(())
}

fn op_strategy() -> impl Strategy<Value = Vec<(u64, Vec<u8>)>> {
    prop::collection::vec(
        (0u64..8192, prop::collection::vec(any::<u8>(), 0..256)),
        1..20,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip_memory(ops in op_strategy()) {
        check_against_model(&mut MemoryStore::new(), "prop.bin", &ops)?;
    }

    #[test]
    fn prop_round_trip_disk(ops in op_strategy()) {
        let dir = TempDir::new().unwrap();
        check_against_model(&mut DiskStore::new(dir.path()), "prop.bin", &ops)?;
    }

    #[test]
    fn prop_round_trip_kv(ops in op_strategy()) {
        // A sidecar path starts empty, so the model applies unchanged.
        check_against_model(
            &mut KvStore::new(MemoryKv::new()),
            "prop.bin-wal",
            &ops,
        )?;
    }

    #[test]
    fn prop_round_trip_bridged(ops in op_strategy()) {
        let mut bridge = SyncBridge::spawn(Box::new(MemoryStore::new()));
        check_against_model(&mut bridge, "prop.bin", &ops)?;
    }

    #[test]
    fn prop_kv_durability(ops in op_strategy()) {
        // Whatever the write sequence, flushed content survives reopen.
        let kv = MemoryKv::new();
        let mut expected: Vec<u8> = Vec::new();
        {
            let mut store = KvStore::new(kv.clone());
            let fd = store.open("prop.bin-wal", OpenMode::read_write()).unwrap();
            for (offset, data) in &ops {
                store.pwrite(fd, data, *offset).unwrap();
                let end = *offset as usize + data.len();
                if end > expected.len() {
                    expected.resize(end, 0);
                }
                expected[*offset as usize..end].copy_from_slice(data);
            }
            store.close(fd).unwrap();
        }

        let mut store = KvStore::new(kv);
        let fd = store.open("prop.bin-wal", OpenMode::read_only()).unwrap();
        prop_assert_eq!(store.size(fd).unwrap(), expected.len() as u64);
        let mut contents = vec![0u8; expected.len()];
        store.pread(fd, &mut contents, 0).unwrap();
        prop_assert_eq!(contents, expected);
        store.close(fd).unwrap();
    }
}

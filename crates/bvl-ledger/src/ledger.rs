//! The version ledger state machine.
//!
//! ```text
//! START ──load──▶ ABSENT ─┐
//!            ├──▶ FOUND ──┴─▶ COMPUTE ──persist──▶ DONE
//!            │                                 └──▶ WRITE_ERROR / CONFLICT
//!            └──▶ READ_ERROR
//! ```
//!
//! There is no retry inside the ledger. Retrying `persist` with a stale token
//! can only conflict again, and re-running `advance` without a fresh `load`
//! would double-increment, so the caller owns retry policy.

use bvl_store::{BlobStore, StoreError};
use bvl_types::{LedgerKey, VersionRecord, VersionToken};
use bvl_version::{generate_tags, parse_branch};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

/// A record read from the store, with the token to pass to the next write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedRecord {
    pub record: VersionRecord,
    pub token: VersionToken,
}

/// Tracks and persists the monotonic build counter of each key.
pub struct VersionLedger<S> {
    store: S,
    config: LedgerConfig,
}

impl<S: BlobStore> VersionLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the current record for `key`.
    ///
    /// A key that was never written is `Ok(None)`. Content that does not
    /// decode is an error, never treated as absent.
    pub fn load(&self, key: &LedgerKey) -> LedgerResult<Option<LoadedRecord>> {
        let path = key.path();
        let blob = self.store.get(&path).map_err(|source| LedgerError::Read {
            key: path.clone(),
            source,
        })?;

        let Some(blob) = blob else {
            debug!(key = %path, "no version record");
            return Ok(None);
        };

        let record = VersionRecord::from_json_bytes(&blob.data).map_err(|e| {
            LedgerError::MalformedRecord {
                key: path.clone(),
                reason: e.to_string(),
            }
        })?;
        debug!(
            key = %path,
            build_number = record.build_number,
            token = blob.token.short(),
            "loaded version record"
        );
        Ok(Some(LoadedRecord {
            record,
            token: blob.token,
        }))
    }

    /// Compute the record that follows `prior` for `branch`.
    ///
    /// Pure: touches no storage.
    pub fn prepare(&self, branch: &str, prior: Option<&VersionRecord>) -> LedgerResult<VersionRecord> {
        let build_number = match prior {
            Some(p) => p.build_number.checked_add(1).ok_or_else(|| {
                LedgerError::BuildNumberOverflow {
                    key: branch.to_string(),
                }
            })?,
            None => self.config.first_build_number,
        };

        let parts = parse_branch(branch);
        if parts.is_fallback() {
            debug!(branch, "branch is not a release branch; using v0.0");
        }
        let tags = generate_tags(&parts.numeric, &parts.suffix, build_number);
        let version = parts.full_version(build_number);
        debug_assert_eq!(version, tags.full_version());
        debug!(branch, build_number, %version, channel = tags.channel(), "prepared version");

        Ok(VersionRecord {
            branch: branch.to_string(),
            build_number,
            version,
            tags: tags.into_vec(),
        })
    }

    /// Conditionally write `record` under `key`.
    ///
    /// `expected` is the token from the `load` this record was derived from,
    /// or `None` if the key was absent. A repeat of a write that already
    /// landed conflicts like any other stale write; the caller reloads.
    pub fn persist(
        &self,
        key: &LedgerKey,
        record: &VersionRecord,
        expected: Option<&VersionToken>,
    ) -> LedgerResult<VersionToken> {
        let path = key.path();
        let data = record.to_json_bytes()?;

        match self.store.put(&path, &data, expected) {
            Ok(token) => {
                info!(
                    key = %path,
                    version = %record.version,
                    build_number = record.build_number,
                    "version record updated"
                );
                Ok(token)
            }
            Err(source @ StoreError::Conflict { .. }) => {
                warn!(key = %path, build_number = record.build_number, "lost version update race");
                Err(LedgerError::WriteConflict { key: path, source })
            }
            Err(source) => Err(LedgerError::Write { key: path, source }),
        }
    }

    /// Load, increment, and persist the record for `key`.
    pub fn advance(&self, key: &LedgerKey, branch: &str) -> LedgerResult<VersionRecord> {
        let loaded = self.load(key)?;
        match &loaded {
            Some(l) => info!(
                key = %key,
                build_number = l.record.build_number,
                "found existing version record"
            ),
            None => info!(
                key = %key,
                first = self.config.first_build_number,
                "no existing version record"
            ),
        }

        let record = self.prepare(branch, loaded.as_ref().map(|l| &l.record))?;
        self.persist(key, &record, loaded.as_ref().map(|l| &l.token))?;
        Ok(record)
    }

    /// [`advance`](Self::advance) with the key derived from the configured
    /// project name.
    pub fn advance_branch(&self, branch: &str) -> LedgerResult<VersionRecord> {
        let key = self.config.key_for(branch)?;
        self.advance(&key, branch)
    }

    /// [`load`](Self::load) with the key derived from the configured project
    /// name.
    pub fn load_branch(&self, branch: &str) -> LedgerResult<Option<LoadedRecord>> {
        let key = self.config.key_for(branch)?;
        self.load(&key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use bvl_store::{FsBlobStore, InMemoryBlobStore, StoreResult, StoredBlob};

    use super::*;

    fn ledger() -> VersionLedger<InMemoryBlobStore> {
        VersionLedger::new(InMemoryBlobStore::new(), LedgerConfig::default())
    }

    fn key(branch: &str) -> LedgerKey {
        LedgerKey::new(None, branch).unwrap()
    }

    fn seed(store: &impl BlobStore, key: &LedgerKey, branch: &str, build_number: u64) {
        let record = VersionRecord {
            branch: branch.into(),
            build_number,
            version: format!("seeded-{build_number}"),
            tags: vec![],
        };
        store
            .put(&key.path(), &record.to_json_bytes().unwrap(), None)
            .unwrap();
    }

    /// Store whose reads or writes fail with an I/O error.
    struct BrokenStore {
        fail_reads: bool,
        inner: InMemoryBlobStore,
    }

    impl BlobStore for BrokenStore {
        fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
            if self.fail_reads {
                return Err(StoreError::Io(std::io::Error::other("unreachable")));
            }
            self.inner.get(key)
        }

        fn put(
            &self,
            key: &str,
            data: &[u8],
            expected: Option<&VersionToken>,
        ) -> StoreResult<VersionToken> {
            let _ = (key, data, expected);
            Err(StoreError::Io(std::io::Error::other("unreachable")))
        }
    }

    /// Store that holds every reader at a barrier until all racers have read.
    struct RendezvousStore {
        inner: Arc<InMemoryBlobStore>,
        barrier: Arc<Barrier>,
    }

    impl BlobStore for RendezvousStore {
        fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
            let blob = self.inner.get(key);
            self.barrier.wait();
            blob
        }

        fn put(
            &self,
            key: &str,
            data: &[u8],
            expected: Option<&VersionToken>,
        ) -> StoreResult<VersionToken> {
            self.inner.put(key, data, expected)
        }
    }

    // ---- Test 1: First build of a release branch ----
    #[test]
    fn first_build_starts_at_one() {
        let ledger = ledger();
        let record = ledger.advance(&key("v2.1"), "v2.1").unwrap();

        assert_eq!(record.build_number, 1);
        assert_eq!(record.version, "v2.1.1");
        assert_eq!(record.tags, ["v2", "v2.1", "v2.1.1", "latest"]);
        assert_eq!(record.branch, "v2.1");
    }

    // ---- Test 2: Prior record is incremented ----
    #[test]
    fn prior_record_is_incremented() {
        let ledger = ledger();
        let k = key("v1.0-beta");
        seed(ledger.store(), &k, "v1.0-beta", 4);

        let record = ledger.advance(&k, "v1.0-beta").unwrap();
        assert_eq!(record.build_number, 5);
        assert_eq!(record.version, "v1.0.5-beta");
        assert_eq!(
            record.tags,
            ["v1-beta", "v1.0-beta", "v1.0.5-beta", "beta"]
        );
    }

    // ---- Test 3: Non-release branches use v0.0 ----
    #[test]
    fn non_release_branch_uses_fallback() {
        let ledger = ledger();
        let k = key("release-candidate");
        seed(ledger.store(), &k, "release-candidate", 6);

        let record = ledger.advance(&k, "release-candidate").unwrap();
        assert_eq!(record.version, "v0.0.7");
        assert_eq!(record.tags, ["v0", "v0.0", "v0.0.7", "latest"]);
    }

    // ---- Test 4: Sequential advances differ by exactly one ----
    #[test]
    fn sequential_advances_differ_by_one() {
        let ledger = ledger();
        let k = key("v3");
        let a = ledger.advance(&k, "v3").unwrap();
        let b = ledger.advance(&k, "v3").unwrap();
        let c = ledger.advance(&k, "v3").unwrap();
        assert_eq!(b.build_number, a.build_number + 1);
        assert_eq!(c.build_number, b.build_number + 1);

        let stored = ledger.load(&k).unwrap().unwrap();
        assert_eq!(stored.record, c);
    }

    // ---- Test 5: Loading an unwritten key is absent, not an error ----
    #[test]
    fn load_unwritten_key_is_none() {
        let ledger = ledger();
        assert!(ledger.load(&key("never")).unwrap().is_none());
    }

    // ---- Test 6: Malformed content is an error, never absent ----
    #[test]
    fn malformed_record_is_an_error() {
        let ledger = ledger();
        let k = key("v1");
        ledger.store().put(&k.path(), b"{\"oops\": true}", None).unwrap();

        let err = ledger.advance(&k, "v1").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedRecord { .. }), "got: {err}");
        assert_eq!(
            ledger.store().get(&k.path()).unwrap().unwrap().data,
            b"{\"oops\": true}"
        );
    }

    // ---- Test 7: Store read failures surface as read errors ----
    #[test]
    fn read_failure_is_read_error() {
        let store = BrokenStore {
            fail_reads: true,
            inner: InMemoryBlobStore::new(),
        };
        let ledger = VersionLedger::new(store, LedgerConfig::default());
        let err = ledger.advance(&key("v1"), "v1").unwrap_err();
        assert!(matches!(err, LedgerError::Read { .. }));
        assert!(!err.is_conflict());
    }

    // ---- Test 8: Store write failures surface as write errors ----
    #[test]
    fn write_failure_is_write_error() {
        let store = BrokenStore {
            fail_reads: false,
            inner: InMemoryBlobStore::new(),
        };
        let ledger = VersionLedger::new(store, LedgerConfig::default());
        let err = ledger.advance(&key("v1"), "v1").unwrap_err();
        assert!(matches!(err, LedgerError::Write { .. }));
        assert!(!err.is_conflict());
    }

    // ---- Test 9: Interleaved load/persist loses the race with a conflict ----
    #[test]
    fn interleaved_writers_conflict() {
        let shared = Arc::new(InMemoryBlobStore::new());
        let a = VersionLedger::new(Arc::clone(&shared), LedgerConfig::default());
        let b = VersionLedger::new(Arc::clone(&shared), LedgerConfig::default());
        let k = key("v1.0");
        seed(&shared, &k, "v1.0", 4);

        let seen_a = a.load(&k).unwrap().unwrap();
        let seen_b = b.load(&k).unwrap().unwrap();
        let next_a = a.prepare("v1.0", Some(&seen_a.record)).unwrap();
        let next_b = b.prepare("v1.0", Some(&seen_b.record)).unwrap();

        a.persist(&k, &next_a, Some(&seen_a.token)).unwrap();
        let err = b.persist(&k, &next_b, Some(&seen_b.token)).unwrap_err();
        assert!(err.is_conflict(), "got: {err}");

        let stored = a.load(&k).unwrap().unwrap();
        assert_eq!(stored.record.build_number, 5);
    }

    // ---- Test 10: Concurrent advances: exactly one wins ----
    #[test]
    fn concurrent_advances_exactly_one_wins() {
        for seeded in [None, Some(4u64)] {
            let shared = Arc::new(InMemoryBlobStore::new());
            let k = key("v1.0-beta");
            if let Some(n) = seeded {
                seed(&shared, &k, "v1.0-beta", n);
            }
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let store = RendezvousStore {
                        inner: Arc::clone(&shared),
                        barrier: Arc::clone(&barrier),
                    };
                    let k = k.clone();
                    thread::spawn(move || {
                        VersionLedger::new(store, LedgerConfig::default()).advance(&k, "v1.0-beta")
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let expected = seeded.map(|n| n + 1).unwrap_or(1);
            let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(winners.len(), 1);
            assert_eq!(winners[0].build_number, expected);

            let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
            assert_eq!(losers.len(), 1);
            assert!(losers[0].is_conflict(), "got: {}", losers[0]);
        }
    }

    // ---- Test 11: Persisting the same record yields the same bytes ----
    #[test]
    fn persist_is_byte_deterministic() {
        let a = ledger();
        let b = ledger();
        let k = key("v2");
        let record = a.prepare("v2", None).unwrap();

        let ta = a.persist(&k, &record, None).unwrap();
        let tb = b.persist(&k, &record, None).unwrap();
        assert_eq!(ta, tb);
        assert_eq!(
            a.store().get(&k.path()).unwrap().unwrap().data,
            b.store().get(&k.path()).unwrap().unwrap().data
        );
    }

    // ---- Test 12: Project name scopes the key ----
    #[test]
    fn project_scoped_advance() {
        let ledger = VersionLedger::new(InMemoryBlobStore::new(), LedgerConfig::for_project("api"));
        ledger.advance_branch("v1").unwrap();

        assert!(ledger.store().exists(".version_api_v1.json").unwrap());
        assert!(!ledger.store().exists(".version_v1.json").unwrap());
        assert_eq!(
            ledger.load_branch("v1").unwrap().unwrap().record.build_number,
            1
        );
    }

    // ---- Test 13: First build number policy is configurable ----
    #[test]
    fn zero_based_policy() {
        let config = LedgerConfig {
            first_build_number: 0,
            ..Default::default()
        };
        let ledger = VersionLedger::new(InMemoryBlobStore::new(), config);
        let first = ledger.advance_branch("v2.1").unwrap();
        assert_eq!(first.version, "v2.1.0");
        assert_eq!(ledger.advance_branch("v2.1").unwrap().build_number, 1);
    }

    // ---- Test 14: Build number overflow is reported ----
    #[test]
    fn overflow_is_an_error() {
        let ledger = ledger();
        let prior = VersionRecord {
            branch: "v1".into(),
            build_number: u64::MAX,
            version: String::new(),
            tags: vec![],
        };
        assert!(matches!(
            ledger.prepare("v1", Some(&prior)),
            Err(LedgerError::BuildNumberOverflow { .. })
        ));
    }

    // ---- Test 15: Filesystem-backed ledger survives reopen ----
    #[test]
    fn fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = VersionLedger::new(FsBlobStore::new(dir.path()), LedgerConfig::default());
            ledger.advance_branch("v4.2-rc").unwrap();
        }
        let ledger = VersionLedger::new(FsBlobStore::new(dir.path()), LedgerConfig::default());
        let record = ledger.advance_branch("v4.2-rc").unwrap();
        assert_eq!(record.version, "v4.2.2-rc");

        let text = std::fs::read_to_string(dir.path().join(".version_v4.2-rc.json")).unwrap();
        assert!(text.contains("\"build_number\": 2"));
    }

    // ---- Test 16: A repeated write with a stale token conflicts ----
    #[test]
    fn repeated_persist_with_stale_token_conflicts() {
        let ledger = ledger();
        let k = key("v2");
        let record = ledger.prepare("v2", None).unwrap();

        ledger.persist(&k, &record, None).unwrap();
        let err = ledger.persist(&k, &record, None).unwrap_err();
        assert!(err.is_conflict(), "got: {err}");

        let loaded = ledger.load(&k).unwrap().unwrap();
        assert_eq!(loaded.record, record);
        let next = ledger.advance(&k, "v2").unwrap();
        assert_eq!(next.build_number, record.build_number + 1);
    }
}

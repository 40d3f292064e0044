//! Write-behind snapshot mirroring.
//!
//! Rooms never read from the mirror and never wait on it. Every broadcast
//! snapshot is pushed onto an unbounded queue; a single worker task drains
//! the queue in order and hands each record to a [`SnapshotMirror`]. Write
//! failures are logged and forgotten, so gameplay keeps going with the
//! mirror slow, failing or absent.

use std::future::Future;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use nim_arena_protocol::{Codec, JsonCodec, ProtocolError, RoomId, RoomSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Errors a mirror backend can report. They never leave the worker task.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("mirror I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encode(#[from] ProtocolError),
}

/// One mirrored row, keyed by `room_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub room_id: RoomId,
    pub room: RoomSnapshot,
    /// Milliseconds since the Unix epoch when the snapshot was taken.
    pub updated_at: u64,
}

/// A place to upsert room records.
///
/// Implement this for a database, a cache, or anything else. The worker
/// calls `upsert` once per record, in broadcast order.
pub trait SnapshotMirror: Send + Sync + 'static {
    /// Inserts or replaces the record for `record.room_id`.
    fn upsert(
        &self,
        record: &RoomRecord,
    ) -> impl Future<Output = Result<(), MirrorError>> + Send;
}

/// Cheap, cloneable handle that rooms use to enqueue snapshots.
#[derive(Debug, Clone)]
pub struct MirrorHandle {
    tx: mpsc::UnboundedSender<RoomRecord>,
}

impl MirrorHandle {
    /// Queues a snapshot for mirroring. Never blocks.
    pub fn record(&self, room_id: &RoomId, room: RoomSnapshot) {
        let record = RoomRecord {
            room_id: room_id.clone(),
            room,
            updated_at: now_millis(),
        };
        if self.tx.send(record).is_err() {
            tracing::debug!(%room_id, "mirror worker gone, dropping snapshot");
        }
    }
}

/// Starts the mirror worker and returns the handle that feeds it.
///
/// The worker stops once every handle has been dropped.
pub fn spawn_mirror<M: SnapshotMirror>(mirror: M) -> MirrorHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<RoomRecord>();

    tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            if let Err(e) = mirror.upsert(&record).await {
                tracing::warn!(
                    room_id = %record.room_id,
                    error = %e,
                    "snapshot mirror write failed"
                );
            }
        }
        tracing::debug!("mirror worker stopped");
    });

    MirrorHandle { tx }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// JsonFileMirror
// ---------------------------------------------------------------------------

/// Mirrors each room to `<dir>/<room id>.json`.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never sees half a record.
#[derive(Debug, Clone)]
pub struct JsonFileMirror {
    dir: PathBuf,
}

impl JsonFileMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the record for `room_id` lives.
    ///
    /// Room ids come straight from clients, so anything outside
    /// `[A-Za-z0-9_-]` is percent-encoded to keep the path inside `dir`.
    pub fn path_for(&self, room_id: &RoomId) -> PathBuf {
        let mut stem = String::with_capacity(room_id.as_str().len());
        for byte in room_id.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                stem.push(byte as char);
            } else {
                stem.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{stem}.json"))
    }
}

impl SnapshotMirror for JsonFileMirror {
    async fn upsert(&self, record: &RoomRecord) -> Result<(), MirrorError> {
        let bytes = JsonCodec.encode(record)?;
        let path = self.path_for(&record.room_id);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use nim_arena_protocol::RoomStatus;

    use super::*;

    fn snapshot(piles: Vec<u32>) -> RoomSnapshot {
        RoomSnapshot {
            players: BTreeMap::new(),
            piles,
            turn_order: vec![],
            status: RoomStatus::Waiting,
            current_turn: 0,
            winner: None,
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "nim-arena-mirror-{tag}-{}-{}",
            std::process::id(),
            now_millis()
        ))
    }

    #[derive(Clone, Default)]
    struct Recording {
        records: Arc<Mutex<Vec<RoomRecord>>>,
        fail_first: Arc<Mutex<bool>>,
    }

    impl SnapshotMirror for Recording {
        async fn upsert(&self, record: &RoomRecord) -> Result<(), MirrorError> {
            {
                let mut fail = self.fail_first.lock().unwrap();
                if *fail {
                    *fail = false;
                    return Err(MirrorError::Io(std::io::Error::other("db down")));
                }
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    async fn wait_for(records: &Arc<Mutex<Vec<RoomRecord>>>, n: usize) {
        for _ in 0..100 {
            if records.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("mirror never received {n} records");
    }

    #[test]
    fn test_path_for_plain_id() {
        let mirror = JsonFileMirror::new("/data");
        assert_eq!(
            mirror.path_for(&"lobby-1".into()),
            PathBuf::from("/data/lobby-1.json")
        );
    }

    #[test]
    fn test_path_for_escapes_traversal() {
        let mirror = JsonFileMirror::new("/data");
        let path = mirror.path_for(&"../etc/passwd".into());
        assert_eq!(path, PathBuf::from("/data/%2E%2E%2Fetc%2Fpasswd.json"));
        assert_eq!(path.parent(), Some(Path::new("/data")));
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let mirror = Recording::default();
        let records = Arc::clone(&mirror.records);
        let handle = spawn_mirror(mirror);

        handle.record(&"r".into(), snapshot(vec![3]));
        handle.record(&"r".into(), snapshot(vec![2]));
        handle.record(&"r".into(), snapshot(vec![1]));
        wait_for(&records, 3).await;

        let piles: Vec<_> = records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.room.piles[0])
            .collect();
        assert_eq!(piles, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_worker_survives_failed_write() {
        let mirror = Recording::default();
        *mirror.fail_first.lock().unwrap() = true;
        let records = Arc::clone(&mirror.records);
        let handle = spawn_mirror(mirror);

        handle.record(&"lost".into(), snapshot(vec![1]));
        handle.record(&"kept".into(), snapshot(vec![2]));
        wait_for(&records, 1).await;

        assert_eq!(records.lock().unwrap()[0].room_id, RoomId::from("kept"));
    }

    #[tokio::test]
    async fn test_json_file_mirror_upserts() {
        let dir = scratch_dir("upsert");
        let mirror = JsonFileMirror::new(&dir);

        let first = RoomRecord {
            room_id: "lobby".into(),
            room: snapshot(vec![5, 6]),
            updated_at: 1,
        };
        mirror.upsert(&first).await.unwrap();
        let second = RoomRecord { room: snapshot(vec![0, 6]), updated_at: 2, ..first };
        mirror.upsert(&second).await.unwrap();

        let bytes = tokio::fs::read(mirror.path_for(&"lobby".into())).await.unwrap();
        let stored: RoomRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(stored, second);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_json_file_mirror_reports_io_errors() {
        // A regular file where the directory should be.
        let blocker = scratch_dir("blocked");
        tokio::fs::write(&blocker, b"not a dir").await.unwrap();
        let mirror = JsonFileMirror::new(&blocker);

        let record = RoomRecord {
            room_id: "r".into(),
            room: snapshot(vec![1]),
            updated_at: 0,
        };
        assert!(matches!(mirror.upsert(&record).await, Err(MirrorError::Io(_))));

        let _ = tokio::fs::remove_file(&blocker).await;
    }
}

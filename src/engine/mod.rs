mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use error::EngineError;
pub use store::{Snapshot, StoreDelta};

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use uuid::Uuid;

use crate::model::{RoomState, User};
use crate::observability;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit snapshot channel ────────────────────────

pub(super) enum StoreCommand {
    Persist {
        delta: StoreDelta,
        response: oneshot::Sender<io::Result<()>>,
    },
}

/// Background task that owns the durable snapshot and batches writes.
/// 1. Block until the first delta arrives.
/// 2. Drain all immediately available deltas (the batch window).
/// 3. Fold the batch into a candidate snapshot, single atomic file write.
/// 4. On success adopt the candidate and ack everyone; on failure keep the
///    previous snapshot and fail the whole batch, so no caller is told a
///    write committed when the file still holds the old state.
async fn snapshot_writer_loop(
    mut snapshot: Snapshot,
    path: PathBuf,
    mut rx: mpsc::Receiver<StoreCommand>,
) {
    while let Some(StoreCommand::Persist { delta, response }) = rx.recv().await {
        let mut batch = vec![(delta, response)];
        while let Ok(StoreCommand::Persist { delta, response }) = rx.try_recv() {
            batch.push((delta, response));
        }

        metrics::histogram!(observability::SNAPSHOT_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();

        let mut candidate = snapshot.clone();
        for (delta, _) in &batch {
            candidate.apply(delta);
        }
        let result = candidate.write_atomic(&path);

        metrics::histogram!(observability::SNAPSHOT_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                snapshot = candidate;
                for (_, tx) in batch {
                    let _ = tx.send(Ok(()));
                }
            }
            Err(e) => {
                metrics::counter!(observability::SNAPSHOT_FLUSH_FAILURES_TOTAL).increment(1);
                tracing::error!("snapshot write failed, rejecting batch: {e}");
                for (_, tx) in batch {
                    let _ = tx.send(Err(io::Error::new(e.kind(), e.to_string())));
                }
            }
        }
    }
}

/// The in-memory arena plus the persistence wrapper around it.
///
/// Each room (with its meetings) lives behind its own `RwLock`, so mutations
/// of one room's booking set are linearized while unrelated rooms proceed in
/// parallel. Conflict decisions always read under the same write lock the
/// mutation commits under. In-memory state is only updated after the
/// snapshot writer acknowledges durability, so a failed persist leaves both
/// memory and disk untouched.
pub struct Engine {
    rooms: DashMap<Uuid, SharedRoomState>,
    users: RwLock<HashMap<Uuid, User>>,
    /// Reverse lookup: meeting id → room id.
    pub(super) meeting_to_room: DashMap<Uuid, Uuid>,
    /// Normalized `name|location` → room id, for atomic uniqueness claims.
    pub(super) room_keys: DashMap<String, Uuid>,
    store_tx: mpsc::Sender<StoreCommand>,
}

impl Engine {
    /// Load the snapshot at `data_path` (absent file → empty store), build
    /// the arena, and spawn the snapshot writer. Must run inside a tokio
    /// runtime.
    pub fn new(data_path: PathBuf) -> io::Result<Self> {
        if let Some(parent) = data_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut snapshot = Snapshot::load(&data_path)?;

        let mut users = HashMap::new();
        for user in &snapshot.users {
            users.insert(user.id, user.clone());
        }

        // Assemble each room's state fully before it goes behind a lock.
        let mut room_states: HashMap<Uuid, RoomState> = snapshot
            .rooms
            .iter()
            .map(|r| (r.id, RoomState::new(r.clone())))
            .collect();
        // Meetings pointing at rooms that no longer exist are dropped here
        // and on the next flush.
        snapshot.meetings.retain(|m| {
            if room_states.contains_key(&m.room_id) {
                true
            } else {
                tracing::warn!(meeting = %m.id, room = %m.room_id, "dropping meeting for missing room");
                false
            }
        });
        let meeting_to_room = DashMap::new();
        for meeting in &snapshot.meetings {
            if let Some(state) = room_states.get_mut(&meeting.room_id) {
                state.insert_meeting(meeting.clone());
                meeting_to_room.insert(meeting.id, meeting.room_id);
            }
        }

        let rooms: DashMap<Uuid, SharedRoomState> = DashMap::new();
        let room_keys = DashMap::new();
        for (id, state) in room_states {
            room_keys.insert(state.room.key(), id);
            rooms.insert(id, Arc::new(RwLock::new(state)));
        }

        let (store_tx, store_rx) = mpsc::channel(4096);
        tokio::spawn(snapshot_writer_loop(snapshot, data_path, store_rx));

        Ok(Self {
            rooms,
            users: RwLock::new(users),
            meeting_to_room,
            room_keys,
            store_tx,
        })
    }

    /// Persist a delta via the background group-commit writer. An error here
    /// means the mutation must not be applied in memory.
    pub(super) async fn persist(&self, delta: StoreDelta) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.store_tx
            .send(StoreCommand::Persist {
                delta,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Persistence("snapshot writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Persistence("snapshot writer dropped response".into()))?
            .map_err(|e| EngineError::Persistence(e.to_string()))
    }

    pub fn room_state(&self, id: &Uuid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn room_for_meeting(&self, meeting_id: &Uuid) -> Option<Uuid> {
        self.meeting_to_room.get(meeting_id).map(|e| *e.value())
    }

    pub(super) fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub(super) fn room_arcs(&self) -> Vec<SharedRoomState> {
        self.rooms.iter().map(|e| e.value().clone()).collect()
    }

    pub(super) fn insert_room_state(&self, id: Uuid, state: RoomState) {
        self.rooms.insert(id, Arc::new(RwLock::new(state)));
    }

    pub(super) fn remove_room_state(&self, id: &Uuid) {
        self.rooms.remove(id);
    }

    pub(super) fn users(&self) -> &RwLock<HashMap<Uuid, User>> {
        &self.users
    }

    /// Lookup meeting → room, fetch the room, acquire its write lock.
    pub(super) async fn resolve_meeting_write(
        &self,
        meeting_id: &Uuid,
    ) -> Result<(Uuid, tokio::sync::OwnedRwLockWriteGuard<RoomState>), EngineError> {
        let room_id = self
            .room_for_meeting(meeting_id)
            .ok_or(EngineError::NotFound(*meeting_id))?;
        let rs = self
            .room_state(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = rs.write_owned().await;
        // The room may have been deleted between the lookup and the lock.
        if guard.deleted {
            return Err(EngineError::NotFound(*meeting_id));
        }
        Ok((room_id, guard))
    }
}

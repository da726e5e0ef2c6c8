use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Meeting, Room, User};

/// The durable form: one JSON document holding every collection, the shape
/// the original `db.json` used. The file is only ever rewritten whole;
/// per-record durability comes from folding [`StoreDelta`]s into the
/// in-memory copy and swapping the file atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
}

/// One committed mutation, as fed to the snapshot writer.
#[derive(Debug, Clone)]
pub enum StoreDelta {
    UserAdded(User),
    UserUpdated(User),
    RoomAdded(Room),
    RoomUpdated(Room),
    RoomRemoved(Uuid),
    MeetingAdded(Meeting),
    MeetingUpdated(Meeting),
    MeetingRemoved(Uuid),
}

impl Snapshot {
    /// Load from disk; a missing file is an empty store.
    pub fn load(path: &Path) -> io::Result<Self> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Write to a temp file, fsync, then rename over `path`. Readers never
    /// observe a partially written snapshot.
    pub fn write_atomic(&self, path: &Path) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp_path = path.with_extension("json.tmp");
        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    }

    /// Fold one delta into the snapshot. Adds are upserts so that apply is
    /// idempotent; removes of absent ids are no-ops.
    pub fn apply(&mut self, delta: &StoreDelta) {
        match delta {
            StoreDelta::UserAdded(user) | StoreDelta::UserUpdated(user) => {
                upsert(&mut self.users, |u| u.id == user.id, user.clone());
            }
            StoreDelta::RoomAdded(room) | StoreDelta::RoomUpdated(room) => {
                upsert(&mut self.rooms, |r| r.id == room.id, room.clone());
            }
            StoreDelta::RoomRemoved(id) => {
                self.rooms.retain(|r| r.id != *id);
                // A room takes its meetings with it.
                self.meetings.retain(|m| m.room_id != *id);
            }
            StoreDelta::MeetingAdded(meeting) | StoreDelta::MeetingUpdated(meeting) => {
                upsert(&mut self.meetings, |m| m.id == meeting.id, meeting.clone());
            }
            StoreDelta::MeetingRemoved(id) => {
                self.meetings.retain(|m| m.id != *id);
            }
        }
    }
}

fn upsert<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool, item: T) {
    match items.iter_mut().find(|i| matches(i)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

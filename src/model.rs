use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Times on the wire and in the snapshot are naive `HH:MM` strings; the
/// whole organization is assumed to share one clock. `HH:MM:SS` is accepted
/// on input for compatibility.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(de)?;
        NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Deactivated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    /// Stored under the original field name `password`; always an Argon2 hash.
    #[serde(rename = "password")]
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub organization_id: String,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// `User` minus the password hash. The only user shape that ever leaves
/// the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub status: UserStatus,
    pub organization_id: String,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            username: u.username,
            role: u.role,
            status: u.status,
            organization_id: u.organization_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub capacity: u32,
    pub description: String,
    pub organization_id: String,
}

impl Room {
    /// Uniqueness key: the `(name, location)` pair, trimmed and lowercased.
    pub fn key(&self) -> String {
        room_key(&self.name, &self.location)
    }
}

pub fn room_key(name: &str, location: &str) -> String {
    format!(
        "{}|{}",
        name.trim().to_lowercase(),
        location.trim().to_lowercase()
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub status: MeetingStatus,
}

impl Meeting {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn is_active(&self) -> bool {
        self.status == MeetingStatus::Active
    }
}

/// Half-open interval `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`. A meeting
    /// ending at 10:00 does not collide with one starting at 10:00.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A room plus every meeting ever booked in it, guarded by one lock.
/// Meetings are kept sorted by `(date, start_time)`.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    pub meetings: Vec<Meeting>,
    /// Set under the write lock when the room is removed. A caller that
    /// fetched this state's handle before the removal committed must treat
    /// the room as gone once it finally acquires the lock.
    pub deleted: bool,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            meetings: Vec::new(),
            deleted: false,
        }
    }

    /// Insert maintaining sort order by `(date, start_time)`.
    pub fn insert_meeting(&mut self, meeting: Meeting) {
        let pos = self
            .meetings
            .binary_search_by_key(&(meeting.date, meeting.start_time), |m| {
                (m.date, m.start_time)
            })
            .unwrap_or_else(|e| e);
        self.meetings.insert(pos, meeting);
    }

    pub fn remove_meeting(&mut self, id: Uuid) -> Option<Meeting> {
        let pos = self.meetings.iter().position(|m| m.id == id)?;
        Some(self.meetings.remove(pos))
    }

    /// Replace a meeting in place, re-sorting if its slot moved.
    pub fn replace_meeting(&mut self, meeting: Meeting) {
        self.remove_meeting(meeting.id);
        self.insert_meeting(meeting);
    }

    pub fn get_meeting(&self, id: Uuid) -> Option<&Meeting> {
        self.meetings.iter().find(|m| m.id == id)
    }

    /// Active meetings on `date`, the only set conflict checks consult.
    pub fn active_on(&self, date: NaiveDate) -> impl Iterator<Item = &Meeting> {
        self.meetings
            .iter()
            .filter(move |m| m.date == date && m.is_active())
    }
}

// ── Patch payloads (absent field = leave unchanged) ──────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let s = Option::<String>::deserialize(de)?;
        match s {
            None => Ok(None),
            Some(s) => NaiveTime::parse_from_str(&s, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

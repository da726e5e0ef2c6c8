use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, validate_range};
use super::{Engine, EngineError, StoreDelta};

impl Engine {
    // ── Rooms ────────────────────────────────────────────────

    pub async fn create_room(&self, room: Room) -> Result<Room, EngineError> {
        validate_room_fields(&room.name, &room.location, &room.description)?;
        if self.room_count() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }

        // Claim the name+location key atomically; losers see Occupied.
        let key = room.key();
        match self.room_keys.entry(key.clone()) {
            Entry::Occupied(_) => return Err(EngineError::Duplicate("room")),
            Entry::Vacant(v) => {
                v.insert(room.id);
            }
        }

        if let Err(e) = self.persist(StoreDelta::RoomAdded(room.clone())).await {
            self.room_keys.remove(&key);
            return Err(e);
        }
        self.insert_room_state(room.id, RoomState::new(room.clone()));
        Ok(room)
    }

    pub async fn update_room(&self, id: Uuid, patch: RoomPatch) -> Result<Room, EngineError> {
        let rs = self.room_state(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = rs.write().await;
        if guard.deleted {
            return Err(EngineError::NotFound(id));
        }

        let mut updated = guard.room.clone();
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(location) = patch.location {
            updated.location = location;
        }
        if let Some(capacity) = patch.capacity {
            updated.capacity = capacity;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        validate_room_fields(&updated.name, &updated.location, &updated.description)?;

        let old_key = guard.room.key();
        let new_key = updated.key();
        if new_key != old_key {
            match self.room_keys.entry(new_key.clone()) {
                Entry::Occupied(e) if *e.get() != id => {
                    return Err(EngineError::Duplicate("room"));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(v) => {
                    v.insert(id);
                }
            }
        }

        if let Err(e) = self.persist(StoreDelta::RoomUpdated(updated.clone())).await {
            if new_key != old_key {
                self.room_keys.remove(&new_key);
            }
            return Err(e);
        }
        if new_key != old_key {
            self.room_keys.remove(&old_key);
        }
        guard.room = updated.clone();
        Ok(updated)
    }

    /// Deleting a room takes its meetings with it (snapshot fold does the
    /// same), so the reverse index is swept here too.
    pub async fn delete_room(&self, id: Uuid) -> Result<(), EngineError> {
        let rs = self.room_state(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = rs.write().await;
        if guard.deleted {
            return Err(EngineError::NotFound(id));
        }
        let key = guard.room.key();
        let meeting_ids: Vec<Uuid> = guard.meetings.iter().map(|m| m.id).collect();

        self.persist(StoreDelta::RoomRemoved(id)).await?;

        // Mutations that fetched this state's handle before the map entries
        // disappear will still acquire the lock; the tombstone tells them
        // the room is gone.
        guard.deleted = true;
        self.remove_room_state(&id);
        self.room_keys.remove(&key);
        for mid in meeting_ids {
            self.meeting_to_room.remove(&mid);
        }
        Ok(())
    }

    // ── Meetings ─────────────────────────────────────────────

    /// Book a meeting. The room's write lock is held across validate,
    /// persist, and apply: this is the scoped exclusive access that keeps
    /// two racing bookings from both passing validation on a stale set.
    pub async fn create_meeting(&self, meeting: Meeting) -> Result<Meeting, EngineError> {
        validate_meeting_fields(&meeting.title, &meeting.description)?;
        validate_range(&meeting.range())?;

        let rs = self
            .room_state(&meeting.room_id)
            .ok_or(EngineError::NotFound(meeting.room_id))?;
        let mut guard = rs.write().await;
        if guard.deleted {
            return Err(EngineError::NotFound(meeting.room_id));
        }
        if guard.meetings.len() >= MAX_MEETINGS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many meetings in room"));
        }

        if meeting.is_active() {
            check_no_conflict(&guard, meeting.date, &meeting.range(), None)?;
        }

        self.persist(StoreDelta::MeetingAdded(meeting.clone())).await?;
        guard.insert_meeting(meeting.clone());
        self.meeting_to_room.insert(meeting.id, meeting.room_id);
        metrics::counter!(crate::observability::BOOKINGS_TOTAL).increment(1);
        Ok(meeting)
    }

    /// Patch a meeting. A reschedule is validated like a fresh booking
    /// against every meeting except this one, so moving within its own old
    /// slot always succeeds.
    pub async fn update_meeting(
        &self,
        id: Uuid,
        patch: MeetingPatch,
    ) -> Result<Meeting, EngineError> {
        let (_room_id, mut guard) = self.resolve_meeting_write(&id).await?;
        let current = guard.get_meeting(id).ok_or(EngineError::NotFound(id))?;

        let mut updated = current.clone();
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(date) = patch.date {
            updated.date = date;
        }
        if let Some(start) = patch.start_time {
            updated.start_time = start;
        }
        if let Some(end) = patch.end_time {
            updated.end_time = end;
        }
        validate_meeting_fields(&updated.title, &updated.description)?;
        validate_range(&updated.range())?;

        if updated.is_active() {
            check_no_conflict(&guard, updated.date, &updated.range(), Some(id))?;
        }

        self.persist(StoreDelta::MeetingUpdated(updated.clone())).await?;
        guard.replace_meeting(updated.clone());
        Ok(updated)
    }

    /// Cancel without deleting: the record stays (distinguishable for
    /// audit), but the slot re-opens for future bookings.
    pub async fn cancel_meeting(&self, id: Uuid) -> Result<Meeting, EngineError> {
        let (_room_id, mut guard) = self.resolve_meeting_write(&id).await?;
        let mut updated = guard
            .get_meeting(id)
            .ok_or(EngineError::NotFound(id))?
            .clone();
        if updated.status == MeetingStatus::Cancelled {
            return Ok(updated);
        }
        updated.status = MeetingStatus::Cancelled;

        self.persist(StoreDelta::MeetingUpdated(updated.clone())).await?;
        guard.replace_meeting(updated.clone());
        Ok(updated)
    }

    pub async fn delete_meeting(&self, id: Uuid) -> Result<(), EngineError> {
        let (_room_id, mut guard) = self.resolve_meeting_write(&id).await?;
        if guard.get_meeting(id).is_none() {
            return Err(EngineError::NotFound(id));
        }

        self.persist(StoreDelta::MeetingRemoved(id)).await?;
        guard.remove_meeting(id);
        self.meeting_to_room.remove(&id);
        Ok(())
    }

    // ── Users ────────────────────────────────────────────────

    /// User mutations are linearized under the single users lock; email and
    /// username uniqueness are checked inside it.
    pub async fn create_user(&self, user: User) -> Result<User, EngineError> {
        validate_user_fields(&user.email, &user.username)?;
        let mut users = self.users().write().await;
        if users.len() >= MAX_USERS {
            return Err(EngineError::LimitExceeded("too many users"));
        }
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(EngineError::Duplicate("email"));
        }
        if users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(EngineError::Duplicate("username"));
        }

        self.persist(StoreDelta::UserAdded(user.clone())).await?;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<User, EngineError> {
        let mut users = self.users().write().await;
        let current = users.get(&id).ok_or(EngineError::NotFound(id))?;

        let mut updated = current.clone();
        if let Some(first_name) = patch.first_name {
            updated.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            updated.last_name = last_name;
        }
        if let Some(email) = patch.email {
            updated.email = email;
        }
        if let Some(username) = patch.username {
            updated.username = username;
        }
        validate_user_fields(&updated.email, &updated.username)?;
        if users
            .values()
            .any(|u| u.id != id && u.email.eq_ignore_ascii_case(&updated.email))
        {
            return Err(EngineError::Duplicate("email"));
        }
        if users
            .values()
            .any(|u| u.id != id && u.username.eq_ignore_ascii_case(&updated.username))
        {
            return Err(EngineError::Duplicate("username"));
        }

        self.persist(StoreDelta::UserUpdated(updated.clone())).await?;
        users.insert(id, updated.clone());
        Ok(updated)
    }

    /// Deactivate or reactivate. Users are never physically deleted.
    pub async fn set_user_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> Result<User, EngineError> {
        let mut users = self.users().write().await;
        let mut updated = users.get(&id).ok_or(EngineError::NotFound(id))?.clone();
        if updated.status == status {
            return Ok(updated);
        }
        updated.status = status;

        self.persist(StoreDelta::UserUpdated(updated.clone())).await?;
        users.insert(id, updated.clone());
        Ok(updated)
    }
}

fn validate_room_fields(
    name: &str,
    location: &str,
    description: &str,
) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::LimitExceeded("room name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("room name too long"));
    }
    if location.trim().is_empty() {
        return Err(EngineError::LimitExceeded("room location must not be empty"));
    }
    if location.len() > MAX_LOCATION_LEN {
        return Err(EngineError::LimitExceeded("room location too long"));
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(EngineError::LimitExceeded("room description too long"));
    }
    Ok(())
}

fn validate_meeting_fields(title: &str, description: &str) -> Result<(), EngineError> {
    if title.trim().is_empty() {
        return Err(EngineError::LimitExceeded("meeting title must not be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(EngineError::LimitExceeded("meeting title too long"));
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(EngineError::LimitExceeded("meeting description too long"));
    }
    Ok(())
}

fn validate_user_fields(email: &str, username: &str) -> Result<(), EngineError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(EngineError::LimitExceeded("email too long"));
    }
    if !email.contains('@') {
        return Err(EngineError::LimitExceeded("email must contain '@'"));
    }
    if username.trim().is_empty() {
        return Err(EngineError::LimitExceeded("username must not be empty"));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(EngineError::LimitExceeded("username too long"));
    }
    Ok(())
}

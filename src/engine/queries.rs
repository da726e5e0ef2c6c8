use uuid::Uuid;

use crate::model::{Meeting, Room, User};

use super::Engine;

/// Read paths. Each takes the relevant room's read lock briefly and clones
/// out owned data, so callers never hold locks across awaits of their own.
impl Engine {
    pub async fn list_rooms(&self) -> Vec<Room> {
        let mut rooms = Vec::with_capacity(self.room_count());
        for rs in self.room_arcs() {
            rooms.push(rs.read().await.room.clone());
        }
        rooms.sort_by(|a, b| (&a.name, &a.location).cmp(&(&b.name, &b.location)));
        rooms
    }

    pub async fn get_room(&self, id: &Uuid) -> Option<Room> {
        let rs = self.room_state(id)?;
        let guard = rs.read().await;
        Some(guard.room.clone())
    }

    pub async fn room_with_meetings(&self, id: &Uuid) -> Option<(Room, Vec<Meeting>)> {
        let rs = self.room_state(id)?;
        let guard = rs.read().await;
        Some((guard.room.clone(), guard.meetings.clone()))
    }

    pub async fn list_meetings(&self) -> Vec<Meeting> {
        let mut meetings = Vec::new();
        for rs in self.room_arcs() {
            meetings.extend(rs.read().await.meetings.iter().cloned());
        }
        meetings.sort_by_key(|m| (m.date, m.start_time, m.id));
        meetings
    }

    pub async fn get_meeting(&self, id: &Uuid) -> Option<Meeting> {
        let room_id = self.room_for_meeting(id)?;
        let rs = self.room_state(&room_id)?;
        let guard = rs.read().await;
        guard.get_meeting(*id).cloned()
    }

    pub async fn meetings_for_user(&self, user_id: &Uuid) -> Vec<Meeting> {
        let mut meetings = Vec::new();
        for rs in self.room_arcs() {
            meetings.extend(
                rs.read()
                    .await
                    .meetings
                    .iter()
                    .filter(|m| m.user_id == *user_id)
                    .cloned(),
            );
        }
        meetings.sort_by_key(|m| (m.date, m.start_time, m.id));
        meetings
    }

    pub async fn list_users(&self) -> Vec<User> {
        let users = self.users().read().await;
        let mut out: Vec<User> = users.values().cloned().collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        out
    }

    pub async fn get_user(&self, id: &Uuid) -> Option<User> {
        self.users().read().await.get(id).cloned()
    }

    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        self.users()
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }
}

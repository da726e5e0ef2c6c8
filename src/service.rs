//! The authenticated facade over the engine. Every operation runs the same
//! pipeline: authenticate the token, authorize against the capability
//! matrix, then execute. Transports (HTTP or otherwise) sit on top of this
//! and translate [`ServiceError`] variants to their own status codes.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, AuthError, Identity, TokenService};
use crate::config::Config;
use crate::engine::{Engine, EngineError};
use crate::limits::{MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};
use crate::model::*;
use crate::observability;
use crate::policy::{Action, Policy, PolicyConfig, Resource};

/// Single-tenant deployment; every record carries this organization.
pub const DEFAULT_ORGANIZATION: &str = "org1";

#[derive(Debug)]
pub enum ServiceError {
    /// No token, bad token, or a token for a missing/deactivated account.
    /// Login failures land here too, with a message that does not reveal
    /// whether the email or the password was wrong.
    Unauthenticated(String),
    Forbidden,
    NotFound,
    InvalidInterval,
    Duplicate(&'static str),
    Validation(&'static str),
    Conflict(Vec<Uuid>),
    Persistence(String),
    Internal(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Unauthenticated(msg) => write!(f, "unauthenticated: {msg}"),
            ServiceError::Forbidden => write!(f, "forbidden"),
            ServiceError::NotFound => write!(f, "not found"),
            ServiceError::InvalidInterval => write!(f, "start time must be before end time"),
            ServiceError::Duplicate(what) => write!(f, "duplicate {what}"),
            ServiceError::Validation(msg) => write!(f, "invalid request: {msg}"),
            ServiceError::Conflict(ids) => {
                write!(f, "conflicts with meeting(s): ")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
            ServiceError::Persistence(e) => write!(f, "store error: {e}"),
            ServiceError::Internal(e) => write!(f, "internal error: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NotFound(_) => ServiceError::NotFound,
            EngineError::Duplicate(what) => ServiceError::Duplicate(what),
            EngineError::InvalidInterval => ServiceError::InvalidInterval,
            EngineError::Conflict(ids) => ServiceError::Conflict(ids),
            EngineError::LimitExceeded(msg) => ServiceError::Validation(msg),
            EngineError::Persistence(msg) => ServiceError::Persistence(msg),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Key => ServiceError::Internal(e.to_string()),
            _ => ServiceError::Unauthenticated(e.to_string()),
        }
    }
}

// ── Request payloads ─────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: String,
    pub location: String,
    pub capacity: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub room_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

pub struct Service {
    engine: Engine,
    tokens: TokenService,
    policy: Policy,
}

impl Service {
    /// Open the store at `config.data_path` and stand up the full pipeline.
    /// Must run inside a tokio runtime.
    pub fn open(config: &Config) -> Result<Self, ServiceError> {
        let engine = Engine::new(config.data_path.clone())
            .map_err(|e| ServiceError::Persistence(e.to_string()))?;
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let policy = Policy::new(PolicyConfig {
            members_can_read_any_user: config.members_can_read_any_user,
        });
        Ok(Self {
            engine,
            tokens,
            policy,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    // ── Authentication ───────────────────────────────────

    /// Token → identity. The signature check alone is not enough: the
    /// subject must still exist and be active, and the effective role is
    /// the stored one, so a role change takes effect before expiry.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, ServiceError> {
        let Some(token) = token else {
            return Err(ServiceError::Unauthenticated("no token provided".into()));
        };
        let claimed = self.tokens.verify(token).inspect_err(|e| {
            metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
            tracing::debug!("token rejected: {e}");
        })?;
        let user = self
            .engine
            .get_user(&claimed.id)
            .await
            .ok_or_else(|| ServiceError::Unauthenticated("unknown subject".into()))?;
        if !user.is_active() {
            metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
            return Err(ServiceError::Unauthenticated("account deactivated".into()));
        }
        Ok(Identity {
            id: user.id,
            role: user.role,
        })
    }

    pub async fn register(
        &self,
        req: RegisterRequest,
    ) -> Result<(UserView, String), ServiceError> {
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation("password too short"));
        }
        if req.password.len() > MAX_PASSWORD_LEN {
            return Err(ServiceError::Validation("password too long"));
        }
        let password_hash =
            auth::hash_password(&req.password).map_err(|e| ServiceError::Internal(e.to_string()))?;

        // Self-registration never grants admin.
        let user = self
            .engine
            .create_user(User {
                id: Uuid::new_v4(),
                first_name: req.first_name,
                last_name: req.last_name,
                email: req.email,
                username: req.username,
                password_hash,
                role: Role::Member,
                status: UserStatus::Active,
                organization_id: DEFAULT_ORGANIZATION.into(),
            })
            .await?;
        let token = self
            .tokens
            .issue(&user)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        tracing::info!(user = %user.id, "registered");
        Ok((user.into(), token))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserView, String), ServiceError> {
        match self.engine.user_by_email(email).await {
            Some(user) if auth::verify_password(password, &user.password_hash) => {
                if !user.is_active() {
                    metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
                    return Err(ServiceError::Unauthenticated("account deactivated".into()));
                }
                let token = self
                    .tokens
                    .issue(&user)
                    .map_err(|e| ServiceError::Internal(e.to_string()))?;
                Ok((user.into(), token))
            }
            // Unknown email and wrong password read identically.
            _ => {
                metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
                Err(ServiceError::Unauthenticated(
                    "invalid email or password".into(),
                ))
            }
        }
    }

    fn authorize(
        &self,
        identity: &Identity,
        resource: Resource,
        action: Action,
        is_owner: impl FnOnce() -> bool,
    ) -> Result<(), ServiceError> {
        if self
            .policy
            .check(identity, resource, action, is_owner)
            .is_allowed()
        {
            Ok(())
        } else {
            metrics::counter!(observability::FORBIDDEN_TOTAL).increment(1);
            tracing::debug!(user = %identity.id, ?resource, ?action, "denied");
            Err(ServiceError::Forbidden)
        }
    }

    // ── Rooms ────────────────────────────────────────────

    pub async fn create_room(
        &self,
        identity: &Identity,
        req: CreateRoomRequest,
    ) -> Result<Room, ServiceError> {
        self.authorize(identity, Resource::Room, Action::Create, || false)?;
        let room = self
            .engine
            .create_room(Room {
                id: Uuid::new_v4(),
                name: req.name,
                location: req.location,
                capacity: req.capacity,
                description: req.description,
                organization_id: DEFAULT_ORGANIZATION.into(),
            })
            .await?;
        Ok(room)
    }

    pub async fn list_rooms(&self, identity: &Identity) -> Result<Vec<Room>, ServiceError> {
        self.authorize(identity, Resource::Room, Action::ListAll, || false)?;
        Ok(self.engine.list_rooms().await)
    }

    pub async fn get_room(&self, identity: &Identity, id: Uuid) -> Result<Room, ServiceError> {
        self.authorize(identity, Resource::Room, Action::Read, || false)?;
        self.engine.get_room(&id).await.ok_or(ServiceError::NotFound)
    }

    /// Room plus its full booking sheet, one consistent read.
    pub async fn room_schedule(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<(Room, Vec<Meeting>), ServiceError> {
        self.authorize(identity, Resource::Room, Action::Read, || false)?;
        self.engine
            .room_with_meetings(&id)
            .await
            .ok_or(ServiceError::NotFound)
    }

    pub async fn update_room(
        &self,
        identity: &Identity,
        id: Uuid,
        patch: RoomPatch,
    ) -> Result<Room, ServiceError> {
        self.authorize(identity, Resource::Room, Action::Update, || false)?;
        Ok(self.engine.update_room(id, patch).await?)
    }

    pub async fn delete_room(&self, identity: &Identity, id: Uuid) -> Result<(), ServiceError> {
        self.authorize(identity, Resource::Room, Action::Delete, || false)?;
        Ok(self.engine.delete_room(id).await?)
    }

    // ── Meetings ─────────────────────────────────────────

    /// Book a meeting for the caller. The booking owner is always the
    /// authenticated identity, never a field of the request.
    pub async fn create_meeting(
        &self,
        identity: &Identity,
        req: CreateMeetingRequest,
    ) -> Result<Meeting, ServiceError> {
        self.authorize(identity, Resource::Meeting, Action::Create, || false)?;
        let meeting = self
            .engine
            .create_meeting(Meeting {
                id: Uuid::new_v4(),
                room_id: req.room_id,
                user_id: identity.id,
                title: req.title,
                description: req.description,
                date: req.date,
                start_time: req.start_time,
                end_time: req.end_time,
                status: MeetingStatus::Active,
            })
            .await?;
        Ok(meeting)
    }

    pub async fn list_meetings(&self, identity: &Identity) -> Result<Vec<Meeting>, ServiceError> {
        self.authorize(identity, Resource::Meeting, Action::ListAll, || false)?;
        Ok(self.engine.list_meetings().await)
    }

    pub async fn my_meetings(&self, identity: &Identity) -> Result<Vec<Meeting>, ServiceError> {
        self.authorize(identity, Resource::Meeting, Action::Read, || true)?;
        Ok(self.engine.meetings_for_user(&identity.id).await)
    }

    pub async fn meetings_for_user(
        &self,
        identity: &Identity,
        user_id: Uuid,
    ) -> Result<Vec<Meeting>, ServiceError> {
        self.authorize(identity, Resource::Meeting, Action::Read, || {
            user_id == identity.id
        })?;
        Ok(self.engine.meetings_for_user(&user_id).await)
    }

    pub async fn get_meeting(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<Meeting, ServiceError> {
        let meeting = self.engine.get_meeting(&id).await.ok_or(ServiceError::NotFound)?;
        self.authorize(identity, Resource::Meeting, Action::Read, || {
            meeting.user_id == identity.id
        })?;
        Ok(meeting)
    }

    pub async fn update_meeting(
        &self,
        identity: &Identity,
        id: Uuid,
        patch: MeetingPatch,
    ) -> Result<Meeting, ServiceError> {
        let meeting = self.engine.get_meeting(&id).await.ok_or(ServiceError::NotFound)?;
        self.authorize(identity, Resource::Meeting, Action::Update, || {
            meeting.user_id == identity.id
        })?;
        Ok(self.engine.update_meeting(id, patch).await?)
    }

    pub async fn cancel_meeting(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<Meeting, ServiceError> {
        let meeting = self.engine.get_meeting(&id).await.ok_or(ServiceError::NotFound)?;
        self.authorize(identity, Resource::Meeting, Action::Update, || {
            meeting.user_id == identity.id
        })?;
        Ok(self.engine.cancel_meeting(id).await?)
    }

    pub async fn delete_meeting(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<(), ServiceError> {
        let meeting = self.engine.get_meeting(&id).await.ok_or(ServiceError::NotFound)?;
        self.authorize(identity, Resource::Meeting, Action::Delete, || {
            meeting.user_id == identity.id
        })?;
        Ok(self.engine.delete_meeting(id).await?)
    }

    // ── Users ────────────────────────────────────────────

    pub async fn list_users(&self, identity: &Identity) -> Result<Vec<UserView>, ServiceError> {
        self.authorize(identity, Resource::User, Action::ListAll, || false)?;
        Ok(self
            .engine
            .list_users()
            .await
            .into_iter()
            .map(UserView::from)
            .collect())
    }

    pub async fn get_user(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> Result<UserView, ServiceError> {
        self.authorize(identity, Resource::User, Action::Read, || id == identity.id)?;
        self.engine
            .get_user(&id)
            .await
            .map(UserView::from)
            .ok_or(ServiceError::NotFound)
    }

    pub async fn profile(&self, identity: &Identity) -> Result<UserView, ServiceError> {
        self.engine
            .get_user(&identity.id)
            .await
            .map(UserView::from)
            .ok_or(ServiceError::NotFound)
    }

    pub async fn update_user(
        &self,
        identity: &Identity,
        id: Uuid,
        patch: UserPatch,
    ) -> Result<UserView, ServiceError> {
        self.authorize(identity, Resource::User, Action::Update, || id == identity.id)?;
        Ok(self.engine.update_user(id, patch).await?.into())
    }

    /// Admin-only. There is deliberately no own-variant here: deactivating
    /// your own account would strand a valid token on a dead user.
    pub async fn set_user_status(
        &self,
        identity: &Identity,
        id: Uuid,
        status: UserStatus,
    ) -> Result<UserView, ServiceError> {
        self.authorize(identity, Resource::User, Action::Update, || false)?;
        Ok(self.engine.set_user_status(id, status).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(name: &str) -> Config {
        let dir = std::env::temp_dir().join("huddle_test_service");
        std::fs::create_dir_all(&dir).unwrap();
        let data_path = dir.join(format!("{name}.json"));
        let _ = std::fs::remove_file(&data_path);
        Config {
            data_path,
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 1,
            members_can_read_any_user: true,
        }
    }

    fn register_req(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Test".into(),
            last_name: "User".into(),
            email: email.into(),
            username: username.into(),
            password: "correct horse".into(),
        }
    }

    fn room_req(name: &str) -> CreateRoomRequest {
        CreateRoomRequest {
            name: name.into(),
            location: "Floor 1".into(),
            capacity: 8,
            description: String::new(),
        }
    }

    fn meeting_req(room_id: Uuid, start_h: u32, end_h: u32) -> CreateMeetingRequest {
        CreateMeetingRequest {
            room_id,
            title: "standup".into(),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end_h, 0, 0).unwrap(),
        }
    }

    /// Seed an admin account directly through the engine; self-registration
    /// only ever produces members.
    async fn seed_admin(svc: &Service) -> Identity {
        let user = svc
            .engine()
            .create_user(User {
                id: Uuid::new_v4(),
                first_name: "Root".into(),
                last_name: "Admin".into(),
                email: "admin@example.com".into(),
                username: "admin".into(),
                password_hash: auth::hash_password("admin-password").unwrap(),
                role: Role::Admin,
                status: UserStatus::Active,
                organization_id: DEFAULT_ORGANIZATION.into(),
            })
            .await
            .unwrap();
        Identity {
            id: user.id,
            role: user.role,
        }
    }

    async fn member(svc: &Service, email: &str, username: &str) -> Identity {
        let (view, _) = svc.register(register_req(email, username)).await.unwrap();
        Identity {
            id: view.id,
            role: view.role,
        }
    }

    #[tokio::test]
    async fn register_login_authenticate_flow() {
        let svc = Service::open(&test_config("auth_flow")).unwrap();
        let (view, token) = svc.register(register_req("ada@example.com", "ada")).await.unwrap();
        assert_eq!(view.role, Role::Member);
        assert_eq!(view.organization_id, DEFAULT_ORGANIZATION);

        let identity = svc.authenticate(Some(&token)).await.unwrap();
        assert_eq!(identity.id, view.id);

        let (_, token2) = svc.login("ada@example.com", "correct horse").await.unwrap();
        assert_eq!(svc.authenticate(Some(&token2)).await.unwrap().id, view.id);

        assert!(matches!(
            svc.authenticate(None).await,
            Err(ServiceError::Unauthenticated(_))
        ));
        assert!(matches!(
            svc.authenticate(Some("garbage")).await,
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = Service::open(&test_config("login_fail")).unwrap();
        svc.register(register_req("ada@example.com", "ada")).await.unwrap();

        let wrong_password = svc.login("ada@example.com", "nope nope").await.unwrap_err();
        let unknown_email = svc.login("ghost@example.com", "correct horse").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn weak_password_rejected_before_hashing() {
        let svc = Service::open(&test_config("weak_pw")).unwrap();
        let mut req = register_req("ada@example.com", "ada");
        req.password = "short".into();
        assert!(matches!(
            svc.register(req).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn room_management_is_admin_only() {
        let svc = Service::open(&test_config("room_admin")).unwrap();
        let admin = seed_admin(&svc).await;
        let m = member(&svc, "ada@example.com", "ada").await;

        assert!(matches!(
            svc.create_room(&m, room_req("Boardroom")).await,
            Err(ServiceError::Forbidden)
        ));
        let room = svc.create_room(&admin, room_req("Boardroom")).await.unwrap();

        // Members can read and list.
        assert_eq!(svc.list_rooms(&m).await.unwrap().len(), 1);
        assert_eq!(svc.get_room(&m, room.id).await.unwrap().id, room.id);

        assert!(matches!(
            svc.delete_room(&m, room.id).await,
            Err(ServiceError::Forbidden)
        ));
        svc.delete_room(&admin, room.id).await.unwrap();
    }

    #[tokio::test]
    async fn members_manage_only_their_own_meetings() {
        let svc = Service::open(&test_config("meeting_own")).unwrap();
        let admin = seed_admin(&svc).await;
        let ada = member(&svc, "ada@example.com", "ada").await;
        let bob = member(&svc, "bob@example.com", "bob").await;
        let room = svc.create_room(&admin, room_req("Boardroom")).await.unwrap();

        let meeting = svc.create_meeting(&ada, meeting_req(room.id, 9, 10)).await.unwrap();
        assert_eq!(meeting.user_id, ada.id);

        // Bob cannot touch Ada's booking.
        assert!(matches!(
            svc.cancel_meeting(&bob, meeting.id).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            svc.delete_meeting(&bob, meeting.id).await,
            Err(ServiceError::Forbidden)
        ));

        // Ada can; so can the admin.
        svc.cancel_meeting(&ada, meeting.id).await.unwrap();
        svc.delete_meeting(&admin, meeting.id).await.unwrap();
        assert!(matches!(
            svc.get_meeting(&ada, meeting.id).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn listing_every_meeting_is_admin_only() {
        let svc = Service::open(&test_config("meeting_list")).unwrap();
        let admin = seed_admin(&svc).await;
        let ada = member(&svc, "ada@example.com", "ada").await;
        let bob = member(&svc, "bob@example.com", "bob").await;
        let room = svc.create_room(&admin, room_req("Boardroom")).await.unwrap();

        svc.create_meeting(&ada, meeting_req(room.id, 9, 10)).await.unwrap();
        svc.create_meeting(&bob, meeting_req(room.id, 10, 11)).await.unwrap();

        assert!(matches!(
            svc.list_meetings(&ada).await,
            Err(ServiceError::Forbidden)
        ));
        assert_eq!(svc.list_meetings(&admin).await.unwrap().len(), 2);

        assert_eq!(svc.my_meetings(&ada).await.unwrap().len(), 1);
        // A member can list their own by id, not another's.
        assert_eq!(svc.meetings_for_user(&ada, ada.id).await.unwrap().len(), 1);
        assert!(matches!(
            svc.meetings_for_user(&ada, bob.id).await,
            Err(ServiceError::Forbidden)
        ));
        assert_eq!(svc.meetings_for_user(&admin, bob.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn booking_conflicts_surface_with_ids() {
        let svc = Service::open(&test_config("conflict_ids")).unwrap();
        let admin = seed_admin(&svc).await;
        let ada = member(&svc, "ada@example.com", "ada").await;
        let room = svc.create_room(&admin, room_req("Boardroom")).await.unwrap();

        let first = svc.create_meeting(&ada, meeting_req(room.id, 9, 11)).await.unwrap();
        let err = svc
            .create_meeting(&ada, meeting_req(room.id, 10, 12))
            .await
            .unwrap_err();
        match err {
            ServiceError::Conflict(ids) => assert_eq!(ids, vec![first.id]),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deactivation_locks_out_live_tokens() {
        let svc = Service::open(&test_config("deactivate")).unwrap();
        let admin = seed_admin(&svc).await;
        let (view, token) = svc.register(register_req("ada@example.com", "ada")).await.unwrap();

        // Members cannot deactivate anyone, themselves included.
        let ada = svc.authenticate(Some(&token)).await.unwrap();
        assert!(matches!(
            svc.set_user_status(&ada, ada.id, UserStatus::Deactivated).await,
            Err(ServiceError::Forbidden)
        ));

        svc.set_user_status(&admin, view.id, UserStatus::Deactivated)
            .await
            .unwrap();

        // The still-valid token no longer authenticates, and login is shut.
        assert!(matches!(
            svc.authenticate(Some(&token)).await,
            Err(ServiceError::Unauthenticated(_))
        ));
        assert!(matches!(
            svc.login("ada@example.com", "correct horse").await,
            Err(ServiceError::Unauthenticated(_))
        ));

        // Reactivation restores both.
        svc.set_user_status(&admin, view.id, UserStatus::Active).await.unwrap();
        svc.authenticate(Some(&token)).await.unwrap();
        svc.login("ada@example.com", "correct horse").await.unwrap();
    }

    #[tokio::test]
    async fn member_user_visibility_follows_config() {
        let open = Service::open(&test_config("vis_open")).unwrap();
        let ada = member(&open, "ada@example.com", "ada").await;
        let bob = member(&open, "bob@example.com", "bob").await;
        assert!(open.get_user(&ada, bob.id).await.is_ok());
        assert!(open.list_users(&ada).await.is_ok());

        let mut cfg = test_config("vis_locked");
        cfg.members_can_read_any_user = false;
        let locked = Service::open(&cfg).unwrap();
        let ada = member(&locked, "ada@example.com", "ada").await;
        let bob = member(&locked, "bob@example.com", "bob").await;
        assert!(matches!(
            locked.get_user(&ada, bob.id).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            locked.list_users(&ada).await,
            Err(ServiceError::Forbidden)
        ));
        // Own profile is always visible.
        assert_eq!(locked.get_user(&ada, ada.id).await.unwrap().id, ada.id);
        assert_eq!(locked.profile(&ada).await.unwrap().id, ada.id);
    }

    #[tokio::test]
    async fn profile_updates_are_own_or_admin() {
        let svc = Service::open(&test_config("profile_update")).unwrap();
        let admin = seed_admin(&svc).await;
        let ada = member(&svc, "ada@example.com", "ada").await;
        let bob = member(&svc, "bob@example.com", "bob").await;

        let patch = UserPatch {
            first_name: Some("Adalyn".into()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update_user(&bob, ada.id, patch.clone()).await,
            Err(ServiceError::Forbidden)
        ));
        assert_eq!(
            svc.update_user(&ada, ada.id, patch.clone()).await.unwrap().first_name,
            "Adalyn"
        );
        assert!(svc.update_user(&admin, ada.id, patch).await.is_ok());

        // The hash never leaves the service layer.
        let views = svc.list_users(&admin).await.unwrap();
        let json = serde_json::to_string(&views).unwrap();
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn registration_issues_usable_tokens_only_for_unique_accounts() {
        let svc = Service::open(&test_config("register_dup")).unwrap();
        svc.register(register_req("ada@example.com", "ada")).await.unwrap();
        assert!(matches!(
            svc.register(register_req("ada@example.com", "ada2")).await,
            Err(ServiceError::Duplicate("email"))
        ));
        assert!(matches!(
            svc.register(register_req("ada2@example.com", "ada")).await,
            Err(ServiceError::Duplicate("username"))
        ));
    }
}

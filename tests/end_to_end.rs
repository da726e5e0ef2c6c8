//! Full-pipeline test: register and log in real users, book through the
//! authenticated service, restart on the same data file, and check that
//! state and enforcement both survive the round trip.

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use huddle::auth::hash_password;
use huddle::config::Config;
use huddle::model::{MeetingStatus, Role, User, UserStatus};
use huddle::service::{
    CreateMeetingRequest, CreateRoomRequest, RegisterRequest, Service, ServiceError,
};

fn test_config(name: &str) -> Config {
    let dir = std::env::temp_dir().join("huddle_test_e2e");
    std::fs::create_dir_all(&dir).unwrap();
    let data_path = dir.join(format!("{name}.json"));
    let _ = std::fs::remove_file(&data_path);
    Config {
        data_path,
        jwt_secret: "e2e-secret".into(),
        token_ttl_hours: 1,
        members_can_read_any_user: true,
    }
}

async fn seed_admin(svc: &Service) -> String {
    let user = svc
        .engine()
        .create_user(User {
            id: Uuid::new_v4(),
            first_name: "Root".into(),
            last_name: "Admin".into(),
            email: "admin@example.com".into(),
            username: "admin".into(),
            password_hash: hash_password("admin-password").unwrap(),
            role: Role::Admin,
            status: UserStatus::Active,
            organization_id: "org1".into(),
        })
        .await
        .unwrap();
    assert_eq!(user.role, Role::Admin);
    let (_, token) = svc.login("admin@example.com", "admin-password").await.unwrap();
    token
}

#[tokio::test]
async fn booking_lifecycle_survives_restart() {
    let config = test_config("lifecycle");

    let room_id;
    let meeting_id;
    let member_token;
    {
        let svc = Service::open(&config).unwrap();
        let admin_token = seed_admin(&svc).await;
        let admin = svc.authenticate(Some(&admin_token)).await.unwrap();

        let (_, token) = svc
            .register(RegisterRequest {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                username: "ada".into(),
                password: "correct horse".into(),
            })
            .await
            .unwrap();
        member_token = token;
        let ada = svc.authenticate(Some(&member_token)).await.unwrap();

        let room = svc
            .create_room(
                &admin,
                CreateRoomRequest {
                    name: "Boardroom".into(),
                    location: "Floor 1".into(),
                    capacity: 12,
                    description: "Projector, whiteboard".into(),
                },
            )
            .await
            .unwrap();
        room_id = room.id;

        let meeting = svc
            .create_meeting(
                &ada,
                CreateMeetingRequest {
                    room_id,
                    title: "Kickoff".into(),
                    description: String::new(),
                    date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                    start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();
        meeting_id = meeting.id;

        // The slot is taken for everyone, admin included.
        let err = svc
            .create_meeting(
                &admin,
                CreateMeetingRequest {
                    room_id,
                    title: "Collides".into(),
                    description: String::new(),
                    date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                    start_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ids) if ids == vec![meeting_id]));
    }

    // Same file, fresh process.
    let svc = Service::open(&config).unwrap();
    let ada = svc.authenticate(Some(&member_token)).await.unwrap();

    let (room, schedule) = svc.room_schedule(&ada, room_id).await.unwrap();
    assert_eq!(room.name, "Boardroom");
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].id, meeting_id);

    // Conflict detection was rebuilt from the snapshot.
    let err = svc
        .create_meeting(
            &ada,
            CreateMeetingRequest {
                room_id,
                title: "Still collides".into(),
                description: String::new(),
                date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Cancelling releases the slot.
    let cancelled = svc.cancel_meeting(&ada, meeting_id).await.unwrap();
    assert_eq!(cancelled.status, MeetingStatus::Cancelled);
    svc.create_meeting(
        &ada,
        CreateMeetingRequest {
            room_id,
            title: "Replacement".into(),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn tokens_are_deployment_scoped() {
    let config_a = test_config("scope_a");
    let config_b = {
        let mut c = test_config("scope_b");
        c.jwt_secret = "a different secret".into();
        c
    };

    let svc_a = Service::open(&config_a).unwrap();
    let svc_b = Service::open(&config_b).unwrap();

    let (_, token) = svc_a
        .register(RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            username: "ada".into(),
            password: "correct horse".into(),
        })
        .await
        .unwrap();

    svc_a.authenticate(Some(&token)).await.unwrap();
    assert!(matches!(
        svc_b.authenticate(Some(&token)).await,
        Err(ServiceError::Unauthenticated(_))
    ));
}

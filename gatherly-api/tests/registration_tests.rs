/// Registration workflow tests
///
/// Exercises the capacity, idempotence, and soft-cancel semantics directly
/// against the database, including the concurrent-registration guarantee.

mod common;

use common::{create_user, TestContext, TestEvent};
use gatherly_shared::models::event::RegistrationMode;
use gatherly_shared::models::registration::{Registration, RegistrationError, RegistrationStatus};
use gatherly_shared::models::user::UserRole;
use uuid::Uuid;

/// Capacity 2: two registrations succeed, the third is rejected, and a
/// cancellation frees the slot again.
#[tokio::test]
async fn test_capacity_scenario() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event = common::create_test_event(
        &ctx.db,
        community.id,
        ctx.user.id,
        TestEvent {
            capacity: 2,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let (u1, _) = ctx.other_user(UserRole::Member).await.unwrap();
    let (u2, _) = ctx.other_user(UserRole::Member).await.unwrap();
    let (u3, _) = ctx.other_user(UserRole::Member).await.unwrap();

    Registration::register(&ctx.db, event.id, u1.id).await.unwrap();
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 1);

    Registration::register(&ctx.db, event.id, u2.id).await.unwrap();
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 2);

    let result = Registration::register(&ctx.db, event.id, u3.id).await;
    assert!(matches!(
        result,
        Err(RegistrationError::CapacityExceeded { capacity: 2 })
    ));
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 2);

    // Cancelling frees a slot
    let cancelled = Registration::unregister(&ctx.db, event.id, u1.id).await.unwrap();
    assert_eq!(cancelled.unwrap().status, RegistrationStatus::Cancelled);
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 1);

    Registration::register(&ctx.db, event.id, u3.id).await.unwrap();
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 2);
}

/// Registering twice yields the same registration row, not a duplicate
#[tokio::test]
async fn test_double_register_is_idempotent() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event =
        common::create_test_event(&ctx.db, community.id, ctx.user.id, TestEvent::default())
            .await
            .unwrap();

    let first = Registration::register(&ctx.db, event.id, ctx.user.id).await.unwrap();
    let second = Registration::register(&ctx.db, event.id, ctx.user.id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 1);
}

/// Unregistering without an active registration is a negative result
#[tokio::test]
async fn test_unregister_without_registration() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event =
        common::create_test_event(&ctx.db, community.id, ctx.user.id, TestEvent::default())
            .await
            .unwrap();

    let result = Registration::unregister(&ctx.db, event.id, ctx.user.id).await.unwrap();
    assert!(result.is_none());
}

/// Registering for a missing event fails with EventNotFound
#[tokio::test]
async fn test_register_for_missing_event() {
    let ctx = TestContext::new().await.unwrap();

    let result = Registration::register(&ctx.db, Uuid::new_v4(), ctx.user.id).await;
    assert!(matches!(result, Err(RegistrationError::EventNotFound(_))));
}

/// Manual-mode events waitlist new registrations without consuming capacity
#[tokio::test]
async fn test_manual_mode_waitlists() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event = common::create_test_event(
        &ctx.db,
        community.id,
        ctx.user.id,
        TestEvent {
            capacity: 1,
            registration_mode: RegistrationMode::Manual,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let (u1, _) = ctx.other_user(UserRole::Member).await.unwrap();
    let (u2, _) = ctx.other_user(UserRole::Member).await.unwrap();

    let r1 = Registration::register(&ctx.db, event.id, u1.id).await.unwrap();
    let r2 = Registration::register(&ctx.db, event.id, u2.id).await.unwrap();

    assert_eq!(r1.status, RegistrationStatus::Waitlisted);
    assert_eq!(r2.status, RegistrationStatus::Waitlisted);
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 0);
}

/// Check-in transitions a registered attendee and stamps the time
#[tokio::test]
async fn test_check_in() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event =
        common::create_test_event(&ctx.db, community.id, ctx.user.id, TestEvent::default())
            .await
            .unwrap();

    let (attendee, _) = ctx.other_user(UserRole::Member).await.unwrap();

    // Nothing to check in yet
    let result = Registration::check_in(&ctx.db, event.id, attendee.id).await.unwrap();
    assert!(result.is_none());

    Registration::register(&ctx.db, event.id, attendee.id).await.unwrap();

    let checked_in = Registration::check_in(&ctx.db, event.id, attendee.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checked_in.status, RegistrationStatus::CheckedIn);
    assert!(checked_in.checked_in_at.is_some());

    // Checked-in attendees still occupy a capacity slot
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 1);
}

/// Concurrent registrations never overbook a capacity-limited event
#[tokio::test]
async fn test_concurrent_registrations_respect_capacity() {
    let ctx = TestContext::new().await.unwrap();
    let community = common::create_test_community(&ctx.db, ctx.user.id).await.unwrap();
    let event = common::create_test_event(
        &ctx.db,
        community.id,
        ctx.user.id,
        TestEvent {
            capacity: 3,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut users = Vec::new();
    for _ in 0..10 {
        let (user, _) = create_user(&ctx.db, &ctx.config.jwt.secret, UserRole::Member)
            .await
            .unwrap();
        users.push(user);
    }

    let mut handles = Vec::new();
    for user in &users {
        let db = ctx.db.clone();
        let event_id = event.id;
        let user_id = user.id;
        handles.push(tokio::spawn(async move {
            Registration::register(&db, event_id, user_id).await
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(RegistrationError::CapacityExceeded { .. }) => rejections += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(rejections, 7);
    assert_eq!(Registration::count_attending(&ctx.db, event.id).await.unwrap(), 3);
}

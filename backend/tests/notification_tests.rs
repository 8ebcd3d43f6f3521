//! Notification delivery tests
//!
//! Tests for the outbox and worker including:
//! - retries with backoff until the sender succeeds
//! - giving up after the configured number of attempts
//! - recording slot confirmations only on success

mod common;

use std::time::Duration;

use proptest::prelude::*;
use uuid::Uuid;

use common::{RecordingSender, TestApp};
use scraplink_backend::external::EmailParams;
use scraplink_backend::services::notification::{EmailKind, OutboundEmail};
use scraplink_backend::services::RetryPolicy;

fn email(kind: EmailKind, request_id: Uuid) -> OutboundEmail {
    OutboundEmail {
        kind,
        request_id,
        params: EmailParams::new("rita@example.com", "Rita", "subject", "message"),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test a send that fails twice is delivered on the third attempt
    #[tokio::test]
    async fn test_retry_until_success() {
        let app = TestApp::with_sender(RecordingSender::failing_next(2))
            .with_retry_policy(RetryPolicy::immediate(5));

        let receipt = app
            .worker
            .deliver(&email(EmailKind::RequestConfirmation, Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(receipt.status, 200);
        assert_eq!(app.sender.attempt_count(), 3);
    }

    /// Test the worker stops after max_attempts
    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let app = TestApp::with_sender(RecordingSender::failing_next(10))
            .with_retry_policy(RetryPolicy::immediate(4));

        let result = app
            .worker
            .deliver(&email(EmailKind::NewPickupRequest, Uuid::new_v4()))
            .await;

        assert!(result.is_err());
        assert_eq!(app.sender.attempt_count(), 4);
    }

    /// Test backoff delays are awaited between attempts
    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_awaited() {
        let app = TestApp::with_sender(RecordingSender::failing_next(2)).with_retry_policy(
            RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_secs(2),
                max_backoff: Duration::from_secs(60),
            },
        );

        let started = tokio::time::Instant::now();
        app.worker
            .deliver(&email(EmailKind::RequestConfirmation, Uuid::new_v4()))
            .await
            .unwrap();

        // 2s after the first failure, 4s after the second
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    /// Test a delivered slot confirmation marks the request notified
    #[tokio::test]
    async fn test_slot_confirmation_marks_request() {
        use scraplink_backend::gateway::PersistenceGateway;
        use scraplink_backend::services::pickup::{AcceptPickupInput, CreatePickupRequestInput};

        let mut app = TestApp::new();
        let seller = app.seller("Sam");
        let recycler = app.recycler("Rita");
        let listing = app.listing(&seller, "metal", 3, 90).await;
        let pickups = app.pickups();

        let request = pickups
            .create(
                &common::session_for(&recycler),
                CreatePickupRequestInput {
                    scrap_id: listing.scrap_id,
                    proposed_slots: common::slots(&["2024-05-01T10:00"]),
                },
            )
            .await
            .unwrap();
        app.discard_queued();

        // Other kinds never touch the flag
        app.worker
            .deliver(&email(EmailKind::RequestConfirmation, request.request_id))
            .await
            .unwrap();
        let stored = app.gateway.get_pickup_request(request.request_id).await.unwrap().unwrap();
        assert!(!stored.slot_notified);

        pickups
            .accept(
                &common::session_for(&seller),
                request.request_id,
                AcceptPickupInput {
                    pickup_slot: "2024-05-01T10:00".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(app.flush_emails().await, 1);

        let stored = app.gateway.get_pickup_request(request.request_id).await.unwrap().unwrap();
        assert!(stored.slot_notified);
    }

    /// Test a slot confirmation for a vanished request is still delivered
    #[tokio::test]
    async fn test_slot_confirmation_for_missing_request() {
        let app = TestApp::new();
        let result = app
            .worker
            .deliver(&email(EmailKind::SlotConfirmed, Uuid::new_v4()))
            .await;
        tokio_test::assert_ok!(result);
        assert_eq!(app.sender.attempt_count(), 1);
    }

    /// Test the spawned worker drains the outbox
    #[tokio::test]
    async fn test_spawned_worker_delivers() {
        let app = TestApp::new();
        let (outbox, receiver) = scraplink_backend::services::NotificationOutbox::channel();
        let handle = app.worker.clone().spawn(receiver);

        assert!(outbox.enqueue(email(EmailKind::NewPickupRequest, Uuid::new_v4())));
        assert!(outbox.enqueue(email(EmailKind::RequestConfirmation, Uuid::new_v4())));
        drop(outbox);

        handle.await.unwrap();
        assert_eq!(app.sender.attempt_count(), 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Backoff never exceeds the cap and never shrinks between attempts
        #[test]
        fn prop_backoff_monotonic_and_capped(
            initial_ms in 0u64..5_000,
            cap_ms in 0u64..120_000,
            attempt in 1u32..64,
        ) {
            let policy = RetryPolicy {
                max_attempts: 5,
                initial_backoff: Duration::from_millis(initial_ms),
                max_backoff: Duration::from_millis(cap_ms),
            };

            let current = policy.backoff_for(attempt);
            let next = policy.backoff_for(attempt + 1);

            prop_assert!(current <= policy.max_backoff);
            prop_assert!(next >= current);
        }

        /// The first retry waits exactly the initial backoff (when under the cap)
        #[test]
        fn prop_first_backoff_is_initial(initial_ms in 0u64..5_000) {
            let policy = RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(initial_ms),
                max_backoff: Duration::from_secs(60),
            };
            prop_assert_eq!(policy.backoff_for(1), Duration::from_millis(initial_ms));
        }
    }
}

//! Admin moderation tests
//!
//! Tests for the admin console operations including:
//! - forward-only status overrides
//! - overrides that keep one accepted request per listing
//! - flagging listings and pickup requests
//! - role changes and deletions
//! - refusing non-admin sessions

mod common;

use rust_decimal::Decimal;
use uuid::Uuid;

use common::{admin_session, session_for, slots, TestApp};
use scraplink_backend::error::AppError;
use scraplink_backend::gateway::PersistenceGateway;
use scraplink_backend::services::admin::{
    FlagInput, UpdateListingStatusInput, UpdatePickupStatusInput, UpdateRoleInput,
    UpdateTransactionStatusInput,
};
use scraplink_backend::services::pickup::{
    AcceptPickupInput, CompletePickupInput, CreatePickupRequestInput,
};
use shared::{FlagTarget, ListingStatus, PickupStatus, TransactionStatus, UserRole};

/// Test listing status can only move forward
#[tokio::test]
async fn test_listing_status_forward_only() {
    let app = TestApp::new();
    let seller = app.seller("Sam");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    let admin = app.admin();

    let skipped = admin
        .update_listing_status(
            &admin_session(),
            listing.scrap_id,
            UpdateListingStatusInput {
                status: ListingStatus::Completed,
            },
        )
        .await;
    assert!(matches!(skipped, Err(AppError::InvalidStateTransition(_))));

    let accepted = admin
        .update_listing_status(
            &admin_session(),
            listing.scrap_id,
            UpdateListingStatusInput {
                status: ListingStatus::Accepted,
            },
        )
        .await
        .unwrap();
    assert_eq!(accepted.status, ListingStatus::Accepted);

    let backwards = admin
        .update_listing_status(
            &admin_session(),
            listing.scrap_id,
            UpdateListingStatusInput {
                status: ListingStatus::Available,
            },
        )
        .await;
    assert!(matches!(backwards, Err(AppError::InvalidStateTransition(_))));
}

fn override_to(status: PickupStatus) -> UpdatePickupStatusInput {
    UpdatePickupStatusInput {
        status,
        pickup_slot: None,
        final_price: None,
    }
}

/// Test pickup status overrides follow the lifecycle order
#[tokio::test]
async fn test_pickup_status_forward_only() {
    let mut app = TestApp::new();
    let seller = app.seller("Sam");
    let recycler = app.recycler("Rita");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    let request = app
        .pickups()
        .create(
            &session_for(&recycler),
            CreatePickupRequestInput {
                scrap_id: listing.scrap_id,
                proposed_slots: slots(&["2024-05-01T10:00"]),
            },
        )
        .await
        .unwrap();
    app.discard_queued();

    let admin = app.admin();
    let skipped = admin
        .update_pickup_status(
            &admin_session(),
            request.request_id,
            override_to(PickupStatus::Completed),
        )
        .await;
    assert!(matches!(skipped, Err(AppError::InvalidStateTransition(_))));

    let accepted = admin
        .update_pickup_status(
            &admin_session(),
            request.request_id,
            override_to(PickupStatus::Accepted),
        )
        .await
        .unwrap();
    assert_eq!(accepted.pickup_status, PickupStatus::Accepted);

    let backwards = admin
        .update_pickup_status(
            &admin_session(),
            request.request_id,
            override_to(PickupStatus::Pending),
        )
        .await;
    assert!(matches!(backwards, Err(AppError::InvalidStateTransition(_))));

    let all = admin.list_pickup_requests(&admin_session()).await.unwrap();
    assert_eq!(all.len(), 1);
}

/// Test an admin accept holds the listing like a seller accept does
#[tokio::test]
async fn test_admin_accept_keeps_one_accepted_request() {
    let mut app = TestApp::new();
    let seller = app.seller("Sam");
    let first = app.recycler("Rita");
    let second = app.recycler("Rob");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    let pickups = app.pickups();

    let a = pickups
        .create(
            &session_for(&first),
            CreatePickupRequestInput {
                scrap_id: listing.scrap_id,
                proposed_slots: slots(&["2024-05-01T10:00", "2024-05-02T14:00"]),
            },
        )
        .await
        .unwrap();
    let b = pickups
        .create(
            &session_for(&second),
            CreatePickupRequestInput {
                scrap_id: listing.scrap_id,
                proposed_slots: slots(&["2024-05-03T09:00"]),
            },
        )
        .await
        .unwrap();
    app.discard_queued();

    let accepted = app
        .admin()
        .update_pickup_status(&admin_session(), a.request_id, override_to(PickupStatus::Accepted))
        .await
        .unwrap();
    // Without a slot the first proposal is confirmed
    assert_eq!(accepted.pickup_slot.as_deref(), Some("2024-05-01T10:00"));
    let listing_now = app.gateway.get_listing(listing.scrap_id).await.unwrap().unwrap();
    assert_eq!(listing_now.status, ListingStatus::Accepted);

    // The recycler hears about it
    assert_eq!(app.flush_emails().await, 1);
    assert_eq!(app.sender.attempts()[0].to_email, first.email);
    assert!(app.sender.attempts()[0].message.contains("Accepted by: Sam"));

    let seller_accept = pickups
        .accept(
            &session_for(&seller),
            b.request_id,
            AcceptPickupInput {
                pickup_slot: "2024-05-03T09:00".to_string(),
            },
        )
        .await;
    assert!(matches!(seller_accept, Err(AppError::Conflict { .. })));

    let admin_accept = app
        .admin()
        .update_pickup_status(&admin_session(), b.request_id, override_to(PickupStatus::Accepted))
        .await;
    assert!(matches!(admin_accept, Err(AppError::Conflict { .. })));

    let accepted_count = app
        .gateway
        .list_all_pickup_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.pickup_status == PickupStatus::Accepted)
        .count();
    assert_eq!(accepted_count, 1);
}

/// Test an admin completion needs a price and records the transaction
#[tokio::test]
async fn test_admin_complete_records_transaction() {
    let mut app = TestApp::new();
    let seller = app.seller("Sam");
    let recycler = app.recycler("Rita");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    let request = app
        .pickups()
        .create(
            &session_for(&recycler),
            CreatePickupRequestInput {
                scrap_id: listing.scrap_id,
                proposed_slots: slots(&["2024-05-01T10:00"]),
            },
        )
        .await
        .unwrap();
    let admin = app.admin();
    admin
        .update_pickup_status(
            &admin_session(),
            request.request_id,
            UpdatePickupStatusInput {
                status: PickupStatus::Accepted,
                pickup_slot: Some("2024-05-04T08:30".to_string()),
                final_price: None,
            },
        )
        .await
        .unwrap();
    app.discard_queued();

    let no_price = admin
        .update_pickup_status(&admin_session(), request.request_id, override_to(PickupStatus::Completed))
        .await;
    assert!(matches!(no_price, Err(AppError::Validation { ref field, .. }) if field == "final_price"));
    assert!(app.gateway.list_all_transactions().await.unwrap().is_empty());

    let completed = admin
        .update_pickup_status(
            &admin_session(),
            request.request_id,
            UpdatePickupStatusInput {
                status: PickupStatus::Completed,
                pickup_slot: None,
                final_price: Some(Decimal::from(80)),
            },
        )
        .await
        .unwrap();
    assert_eq!(completed.pickup_status, PickupStatus::Completed);
    assert_eq!(completed.pickup_slot.as_deref(), Some("2024-05-04T08:30"));

    let listing_now = app.gateway.get_listing(listing.scrap_id).await.unwrap().unwrap();
    assert_eq!(listing_now.status, ListingStatus::Completed);
    let transactions = app.gateway.list_all_transactions().await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].final_price, Decimal::from(80));
    assert_eq!(transactions[0].seller_id, seller.user_id);
    assert_eq!(transactions[0].recycler_id, recycler.user_id);
}

/// Test flags on listings and requests carry the reason and the admin
#[tokio::test]
async fn test_flag_listing_and_request() {
    let mut app = TestApp::new();
    let seller = app.seller("Sam");
    let recycler = app.recycler("Rita");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    let request = app
        .pickups()
        .create(
            &session_for(&recycler),
            CreatePickupRequestInput {
                scrap_id: listing.scrap_id,
                proposed_slots: slots(&["2024-05-01T10:00"]),
            },
        )
        .await
        .unwrap();
    app.discard_queued();

    let admin = app.admin();
    let session = admin_session();
    let admin_id = session.current_admin().map(|a| a.admin_id);

    let flag = admin
        .flag_listing(
            &session,
            listing.scrap_id,
            FlagInput {
                reason: "  Photos do not match  ".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(flag.target, FlagTarget::Listing);
    assert_eq!(flag.target_id, listing.scrap_id);
    assert_eq!(flag.reason, "Photos do not match");
    assert_eq!(flag.flagged_by, admin_id);

    admin
        .flag_pickup_request(
            &session,
            request.request_id,
            FlagInput {
                reason: "No-show twice".to_string(),
            },
        )
        .await
        .unwrap();

    let listing_flags = admin
        .list_flags(&session, FlagTarget::Listing, listing.scrap_id)
        .await
        .unwrap();
    assert_eq!(listing_flags, vec![flag]);
    let request_flags = admin
        .list_flags(&session, FlagTarget::PickupRequest, request.request_id)
        .await
        .unwrap();
    assert_eq!(request_flags.len(), 1);
    assert_eq!(request_flags[0].reason, "No-show twice");

    // Deleting the listing takes its flags and its requests' flags along
    admin.delete_listing(&session, listing.scrap_id).await.unwrap();
    assert!(app
        .gateway
        .list_flags(FlagTarget::PickupRequest, request.request_id)
        .await
        .unwrap()
        .is_empty());
}

/// Test flags need a reason, an existing target and an admin
#[tokio::test]
async fn test_flag_rejections() {
    let app = TestApp::new();
    let seller = app.seller("Sam");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    let admin = app.admin();

    let blank = admin
        .flag_listing(&admin_session(), listing.scrap_id, FlagInput { reason: " ".to_string() })
        .await;
    assert!(matches!(blank, Err(AppError::Validation { ref field, .. }) if field == "reason"));

    let missing = admin
        .flag_pickup_request(
            &admin_session(),
            Uuid::new_v4(),
            FlagInput {
                reason: "spam".to_string(),
            },
        )
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let as_seller = admin
        .flag_listing(
            &session_for(&seller),
            listing.scrap_id,
            FlagInput {
                reason: "spam".to_string(),
            },
        )
        .await;
    assert!(matches!(as_seller, Err(AppError::Forbidden(_))));

    assert!(app
        .gateway
        .list_flags(FlagTarget::Listing, listing.scrap_id)
        .await
        .unwrap()
        .is_empty());
}

/// Test transaction status may be set to dispute or refund
#[tokio::test]
async fn test_transaction_dispute() {
    let mut app = TestApp::new();
    let seller = app.seller("Sam");
    let recycler = app.recycler("Rita");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    let pickups = app.pickups();

    let request = pickups
        .create(
            &session_for(&recycler),
            CreatePickupRequestInput {
                scrap_id: listing.scrap_id,
                proposed_slots: slots(&["2024-05-01T10:00"]),
            },
        )
        .await
        .unwrap();
    pickups
        .accept(
            &session_for(&seller),
            request.request_id,
            AcceptPickupInput {
                pickup_slot: "2024-05-01T10:00".to_string(),
            },
        )
        .await
        .unwrap();
    let transaction = pickups
        .complete(
            &session_for(&seller),
            request.request_id,
            CompletePickupInput {
                final_price: Decimal::new(1250, 2),
            },
        )
        .await
        .unwrap();
    app.discard_queued();

    let disputed = app
        .admin()
        .update_transaction_status(
            &admin_session(),
            transaction.transaction_id,
            UpdateTransactionStatusInput {
                status: TransactionStatus::Disputed,
            },
        )
        .await
        .unwrap();
    assert_eq!(disputed.status, TransactionStatus::Disputed);
    assert_eq!(disputed.final_price, Decimal::new(1250, 2));
}

/// Test role changes and user deletion
#[tokio::test]
async fn test_user_management() {
    let app = TestApp::new();
    let user = app.seller("Sam");
    let admin = app.admin();

    let updated = admin
        .update_user_role(
            &admin_session(),
            user.user_id,
            UpdateRoleInput {
                role: UserRole::Recycler,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, UserRole::Recycler);

    admin.delete_user(&admin_session(), user.user_id).await.unwrap();
    assert!(app.gateway.get_user(user.user_id).await.unwrap().is_none());

    let again = admin.delete_user(&admin_session(), user.user_id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

/// Test deleting a listing removes its requests
#[tokio::test]
async fn test_delete_listing_cascades() {
    let mut app = TestApp::new();
    let seller = app.seller("Sam");
    let recycler = app.recycler("Rita");
    let listing = app.listing(&seller, "metal", 1, 10).await;
    app.pickups()
        .create(
            &session_for(&recycler),
            CreatePickupRequestInput {
                scrap_id: listing.scrap_id,
                proposed_slots: slots(&["soon"]),
            },
        )
        .await
        .unwrap();
    app.discard_queued();

    app.admin()
        .delete_listing(&admin_session(), listing.scrap_id)
        .await
        .unwrap();
    assert!(app.gateway.get_listing(listing.scrap_id).await.unwrap().is_none());
    assert!(app.gateway.list_all_pickup_requests().await.unwrap().is_empty());
}

/// Test user sessions cannot moderate
#[tokio::test]
async fn test_user_session_forbidden() {
    let app = TestApp::new();
    let seller = app.seller("Sam");

    let result = app.admin().list_users(&session_for(&seller)).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

//! Shared fixtures for integration tests
//!
//! Everything runs against the in-memory gateway with recording email senders
//! and a scripted price oracle.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use scraplink_backend::config::Config;
use scraplink_backend::external::{
    EmailParams, EmailReceipt, EmailSender, NotificationError, PredictionError, PriceOracle,
    PricePrediction, PricePredictionRequest,
};
use scraplink_backend::gateway::{InMemoryGateway, PersistenceGateway};
use scraplink_backend::services::notification::OutboundEmail;
use scraplink_backend::services::{
    AdminService, ListingService, NotificationOutbox, NotificationWorker, PickupService,
    RetryPolicy, TransactionService,
};
use scraplink_backend::session::SessionContext;
use scraplink_backend::AppState;
use shared::{AdminIdentity, Identity, NewListing, ScrapListing, UserProfile, UserRole};

// ============================================================================
// Email senders
// ============================================================================

/// Records every send attempt; fails the attempts scripted in `failures`
#[derive(Default)]
pub struct RecordingSender {
    attempts: Mutex<Vec<EmailParams>>,
    /// `true` = fail that attempt; attempts beyond the script succeed
    failures: Mutex<VecDeque<bool>>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `n` attempts
    pub fn failing_next(n: usize) -> Arc<Self> {
        let sender = Self::default();
        if let Ok(mut failures) = sender.failures.lock() {
            failures.extend(std::iter::repeat(true).take(n));
        }
        Arc::new(sender)
    }

    pub fn attempts(&self) -> Vec<EmailParams> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts().len()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.attempts().into_iter().map(|p| p.subject).collect()
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, params: &EmailParams) -> Result<EmailReceipt, NotificationError> {
        self.attempts.lock().unwrap().push(params.clone());
        let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);
        if fail {
            return Err(NotificationError::Rejected {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(EmailReceipt {
            status: 200,
            text: "OK".to_string(),
        })
    }
}

// ============================================================================
// Price oracle
// ============================================================================

/// Answers `base_price * weight`, or fails when `failing` is set
pub struct ScriptedOracle {
    pub base_price: f64,
    pub failing: bool,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn pricing(base_price: f64) -> Arc<Self> {
        Arc::new(Self {
            base_price,
            failing: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            base_price: 0.0,
            failing: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn health(&self) -> bool {
        !self.failing
    }

    async fn predict(&self, request: &PricePredictionRequest) -> Result<PricePrediction, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(PredictionError::Rejected {
                status: 500,
                message: "ML Prediction failed".to_string(),
            });
        }
        Ok(PricePrediction::from_wire(self.base_price, None, request.weight))
    }
}

// ============================================================================
// Test application
// ============================================================================

pub struct TestApp {
    pub gateway: Arc<InMemoryGateway>,
    pub sender: Arc<RecordingSender>,
    pub oracle: Arc<ScriptedOracle>,
    pub outbox: NotificationOutbox,
    pub worker: NotificationWorker,
    receiver: UnboundedReceiver<OutboundEmail>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(RecordingSender::new(), ScriptedOracle::pricing(20.0))
    }

    pub fn with_sender(sender: Arc<RecordingSender>) -> Self {
        Self::with(sender, ScriptedOracle::pricing(20.0))
    }

    pub fn with(sender: Arc<RecordingSender>, oracle: Arc<ScriptedOracle>) -> Self {
        let gateway = Arc::new(InMemoryGateway::new());
        let (outbox, receiver) = NotificationOutbox::channel();
        let worker = NotificationWorker::new(
            sender.clone(),
            gateway.clone(),
            RetryPolicy::immediate(1),
        );
        Self {
            gateway,
            sender,
            oracle,
            outbox,
            worker,
            receiver,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.worker = NotificationWorker::new(self.sender.clone(), self.gateway.clone(), policy);
        self
    }

    pub fn pickups(&self) -> PickupService {
        PickupService::new(self.gateway.clone(), self.outbox.clone())
    }

    pub fn listings(&self) -> ListingService {
        ListingService::new(self.gateway.clone(), self.oracle.clone())
    }

    pub fn transactions(&self) -> TransactionService {
        TransactionService::new(self.gateway.clone())
    }

    pub fn admin(&self) -> AdminService {
        AdminService::new(self.gateway.clone(), self.outbox.clone())
    }

    pub fn state(&self) -> AppState {
        AppState {
            gateway: self.gateway.clone(),
            config: Arc::new(test_config()),
            outbox: self.outbox.clone(),
            price_oracle: self.oracle.clone(),
        }
    }

    /// Deliver every queued email through the worker
    pub async fn flush_emails(&mut self) -> usize {
        self.worker.drain(&mut self.receiver).await
    }

    /// Number of emails waiting in the outbox, removing them undelivered
    pub fn discard_queued(&mut self) -> usize {
        let mut count = 0;
        while self.receiver.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    pub fn user(&self, name: &str, role: UserRole, location: Option<(f64, f64)>) -> UserProfile {
        let profile = UserProfile {
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: Some("0812345678".to_string()),
            role,
            latitude: location.map(|l| l.0),
            longitude: location.map(|l| l.1),
            registered_at: Utc::now(),
        };
        self.gateway.seed_user(profile.clone()).unwrap();
        profile
    }

    pub fn seller(&self, name: &str) -> UserProfile {
        self.user(name, UserRole::Seller, Some((13.7563, 100.5018)))
    }

    pub fn recycler(&self, name: &str) -> UserProfile {
        self.user(name, UserRole::Recycler, Some((13.7563, 100.5018)))
    }

    pub async fn listing(&self, owner: &UserProfile, scrap_type: &str, weight: i64, price: i64) -> ScrapListing {
        self.gateway
            .insert_listing(NewListing {
                user_id: owner.user_id,
                scrap_type: scrap_type.to_string(),
                sub_category: "mixed".to_string(),
                description: "test listing".to_string(),
                weight: Decimal::from(weight),
                estimated_price: Decimal::from(price),
                latitude: owner.latitude,
                longitude: owner.longitude,
            })
            .await
            .unwrap()
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config
}

pub fn session_for(profile: &UserProfile) -> SessionContext {
    let mut session = SessionContext::loading();
    session.init(Some(Identity::User(profile.clone())));
    session
}

pub fn admin_session() -> SessionContext {
    let mut session = SessionContext::loading();
    session.init(Some(Identity::Admin(AdminIdentity {
        admin_id: Uuid::new_v4(),
        email: "admin@scraplink.test".to_string(),
    })));
    session
}

pub fn anonymous() -> SessionContext {
    let mut session = SessionContext::loading();
    session.init(None);
    session
}

pub fn slots(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

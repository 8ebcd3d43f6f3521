//! Transaction history

use std::sync::Arc;

use shared::Transaction;

use crate::error::AppResult;
use crate::gateway::PersistenceGateway;
use crate::session::SessionContext;

#[derive(Clone)]
pub struct TransactionService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl TransactionService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Transactions where the current user is seller or recycler, newest first
    pub async fn mine(&self, session: &SessionContext) -> AppResult<Vec<Transaction>> {
        let user = session.require_user()?;
        Ok(self.gateway.list_transactions_for_user(user.user_id).await?)
    }
}

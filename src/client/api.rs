use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ClientError;
use crate::models::RosterSnapshot;
use crate::services::roster_service::{self, RosterStore};

/// Request/response access to the roster. Mutations return the success
/// message to show; they are never retried here.
#[async_trait]
pub trait RosterApi: Send + Sync {
    async fn fetch_activities(&self) -> Result<RosterSnapshot, ClientError>;
    async fn signup(&self, activity: &str, email: &str) -> Result<String, ClientError>;
    async fn unregister(&self, activity: &str, email: &str) -> Result<String, ClientError>;
}

#[async_trait]
impl<T: RosterApi + ?Sized> RosterApi for Arc<T> {
    async fn fetch_activities(&self) -> Result<RosterSnapshot, ClientError> {
        (**self).fetch_activities().await
    }

    async fn signup(&self, activity: &str, email: &str) -> Result<String, ClientError> {
        (**self).signup(activity, email).await
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<String, ClientError> {
        (**self).unregister(activity, email).await
    }
}

/// Talks to a store in the same process.
#[derive(Clone)]
pub struct LocalRosterApi {
    store: Arc<RosterStore>,
}

impl LocalRosterApi {
    pub fn new(store: Arc<RosterStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RosterApi for LocalRosterApi {
    async fn fetch_activities(&self) -> Result<RosterSnapshot, ClientError> {
        Ok(self.store.list_activities().await)
    }

    async fn signup(&self, activity: &str, email: &str) -> Result<String, ClientError> {
        self.store.signup(activity, email).await?;
        Ok(roster_service::signup_message(activity, email))
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<String, ClientError> {
        self.store.unregister(activity, email).await?;
        Ok(roster_service::unregister_message(activity, email))
    }
}

use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

pub type IdentityListener = Box<dyn Fn(Option<&Identity>) + Send + Sync>;

/// Contract of the hosted identity service.
pub trait IdentityProvider: Send + Sync + 'static {
    fn current_user(&self) -> Option<Identity>;

    /// Register a listener called with the new identity (or `None`) on every sign-in and sign-out.
    fn on_identity_change(&self, listener: IdentityListener);

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<Identity>> + Send;

    fn sign_up(&self, email: &str, password: &str) -> impl Future<Output = Result<Identity>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;
}

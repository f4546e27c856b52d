use std::sync::Arc;

use anyhow::{bail, Result};
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::db::{models::Role, Database};

use super::identity::{Identity, IdentityProvider};

/// The signed-in user as seen by every service call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl UserContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Standard => bail!("{} is not an administrator", self.user_id),
            Role::Unresolved => bail!("role for {} could not be resolved", self.user_id),
        }
    }
}

pub struct AuthGate<P: IdentityProvider> {
    provider: Arc<P>,
    db: Database,
    identity_rx: watch::Receiver<Option<Identity>>,
}

impl<P: IdentityProvider> AuthGate<P> {
    pub fn new(provider: Arc<P>, db: Database) -> Self {
        let (identity_tx, identity_rx) = watch::channel(provider.current_user());
        provider.on_identity_change(Box::new(move |identity: Option<&Identity>| {
            identity_tx.send_replace(identity.cloned());
        }));

        Self {
            provider,
            db,
            identity_rx,
        }
    }

    /// Receiver that observes every identity change reported by the provider.
    pub fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
        self.identity_rx.clone()
    }

    /// Context for whoever is signed in right now, or `None` when signed out.
    pub async fn resolve(&self) -> Option<UserContext> {
        let identity = self.provider.current_user()?;
        Some(self.context_for(identity).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserContext> {
        let identity = self.provider.sign_in(email, password).await?;
        info!("Signed in {}", identity.user_id);
        Ok(self.context_for(identity).await)
    }

    /// Create the account and its profile row. New profiles start as standard users.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<UserContext> {
        let identity = self.provider.sign_up(email, password).await?;
        let profile = self.db.ensure_profile(&identity.user_id, &identity.email).await?;
        info!("Signed up {}", identity.user_id);

        Ok(UserContext {
            user_id: identity.user_id,
            email: identity.email,
            role: profile.role,
        })
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await
    }

    async fn context_for(&self, identity: Identity) -> UserContext {
        let role = self.resolve_role(&identity.user_id).await;
        UserContext {
            user_id: identity.user_id,
            email: identity.email,
            role,
        }
    }

    async fn resolve_role(&self, user_id: &str) -> Role {
        match self.db.get_profile(user_id).await {
            Ok(Some(profile)) => profile.role,
            Ok(None) => {
                warn!("No profile for {user_id}; role unresolved");
                Role::Unresolved
            }
            Err(err) => {
                error!("Profile lookup for {user_id} failed: {err:#}");
                Role::Unresolved
            }
        }
    }
}

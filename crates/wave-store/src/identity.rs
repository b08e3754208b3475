use std::sync::{Arc, RwLock};

use wave_shared::UserId;

/// Hosted identity provider, reduced to what the client needs: who is
/// signed in on this device right now.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Session holder for a single device.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    current: Arc<RwLock<Option<UserId>>>,
}

impl SessionIdentity {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(user: impl Into<UserId>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(user.into()))),
        }
    }

    pub fn sign_in(&self, user: impl Into<UserId>) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(user.into());
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.current.read().ok().and_then(|c| c.clone())
    }
}

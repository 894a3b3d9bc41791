use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::users::Role;

/// The verdict of the identity gate for one request: who is calling, in which
/// role, and until when that verdict may be trusted.
///
/// Built per request and passed by value into the engine; there is no ambient
/// session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role, ttl: Duration) -> Self {
        Self {
            user_id,
            role,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Fail with `Unauthenticated` once the capability went stale.
    pub fn ensure_active(&self) -> EngineResult<()> {
        if self.is_expired(Utc::now()) {
            return Err(EngineError::Unauthenticated(
                "Session role has expired, re-authenticate".to_string(),
            ));
        }
        Ok(())
    }

    /// Admins act on anyone's behalf; everyone else only on their own.
    pub fn acts_for(&self, user_id: Uuid) -> bool {
        self.is_admin() || self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_caller_is_active() {
        let caller = Caller::new(Uuid::new_v4(), Role::Customer, Duration::minutes(5));
        assert!(caller.ensure_active().is_ok());
    }

    #[test]
    fn test_expired_caller_is_unauthenticated() {
        let caller = Caller::new(Uuid::new_v4(), Role::Provider, Duration::seconds(-1));
        assert!(matches!(
            caller.ensure_active(),
            Err(EngineError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_admin_acts_for_anyone() {
        let admin = Caller::new(Uuid::new_v4(), Role::Admin, Duration::minutes(5));
        let customer = Caller::new(Uuid::new_v4(), Role::Customer, Duration::minutes(5));
        let other = Uuid::new_v4();

        assert!(admin.acts_for(other));
        assert!(customer.acts_for(customer.user_id));
        assert!(!customer.acts_for(other));
    }
}

//! External credential and user store interface
//!
//! The engine never persists anything itself; it consumes these lookups at
//! the few points a ceremony touches stored identity. All methods are async
//! because real stores perform I/O. An in-memory implementation is provided
//! for tests and examples.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::errors::PasskeyError;
use crate::passkey::types::{UserEntity, UserPasskeyInfo};

/// Lookups the ceremony orchestrator needs from the surrounding identity
/// system. Implementations map their own failures into
/// [`PasskeyError::Unexpected`].
#[async_trait]
pub trait PasskeyStore: Send + Sync {
    /// Find a stored credential by its raw credential ID, across all users
    async fn find_credential_by_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserPasskeyInfo>, PasskeyError>;

    /// Find a user by their ID (the base64url user handle)
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, PasskeyError>;

    /// Find the user owning a credential
    async fn find_user_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserEntity>, PasskeyError>;

    /// All passkeys registered for a user
    async fn passkeys_for_user(&self, user_id: &str)
        -> Result<Vec<UserPasskeyInfo>, PasskeyError>;
}

/// In-memory store backed by a `RwLock`, for tests and examples
#[derive(Default)]
pub struct MemoryPasskeyStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserEntity>,
    passkeys: HashMap<String, Vec<UserPasskeyInfo>>,
}

impl MemoryPasskeyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user.
    ///
    /// # Panics
    /// Panics if the lock is poisoned; acceptable for a test double.
    pub fn insert_user(&self, user: UserEntity) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.users.insert(user.id.clone(), user);
    }

    /// Attach a passkey to a user.
    ///
    /// # Panics
    /// Panics if the lock is poisoned; acceptable for a test double.
    pub fn insert_passkey(&self, user_id: &str, passkey: UserPasskeyInfo) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner
            .passkeys
            .entry(user_id.to_string())
            .or_default()
            .push(passkey);
    }
}

#[async_trait]
impl PasskeyStore for MemoryPasskeyStore {
    async fn find_credential_by_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserPasskeyInfo>, PasskeyError> {
        let inner = lock_read(&self.inner)?;
        Ok(inner
            .passkeys
            .values()
            .flatten()
            .find(|p| p.credential_id == credential_id)
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<UserEntity>, PasskeyError> {
        let inner = lock_read(&self.inner)?;
        Ok(inner.users.get(user_id).cloned())
    }

    async fn find_user_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<UserEntity>, PasskeyError> {
        let inner = lock_read(&self.inner)?;
        let owner_id = inner
            .passkeys
            .iter()
            .find(|(_, passkeys)| passkeys.iter().any(|p| p.credential_id == credential_id))
            .map(|(user_id, _)| user_id);
        Ok(owner_id.and_then(|id| inner.users.get(id).cloned()))
    }

    async fn passkeys_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserPasskeyInfo>, PasskeyError> {
        let inner = lock_read(&self.inner)?;
        Ok(inner.passkeys.get(user_id).cloned().unwrap_or_default())
    }
}

fn lock_read(lock: &RwLock<Inner>) -> Result<std::sync::RwLockReadGuard<'_, Inner>, PasskeyError> {
    lock.read()
        .map_err(|_| PasskeyError::Unexpected("store lock poisoned".to_string()))
}

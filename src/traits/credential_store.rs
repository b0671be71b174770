use anyhow::Result;

use crate::types::Identity;

/// Persistent mapping from identity name to credential material.
///
/// Single writer. Callers check `exists`/`get` before `put`; the store does
/// not make check-then-put atomic.
pub trait CredentialStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &'static str;

    fn exists(&self, name: &str) -> Result<bool>;

    /// Fails with `WalletError::NotFound` when absent.
    fn get(&self, name: &str) -> Result<Identity>;

    /// Fails with `WalletError::AlreadyExists` instead of overwriting.
    fn put(&self, name: &str, identity: &Identity) -> Result<()>;

    /// Look up an identity, mapping absence to `None`.
    fn find(&self, name: &str) -> Result<Option<Identity>> {
        if self.exists(name)? {
            Ok(Some(self.get(name)?))
        } else {
            Ok(None)
        }
    }
}

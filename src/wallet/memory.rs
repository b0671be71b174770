use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::WalletError;
use crate::traits::CredentialStore;
use crate::types::Identity;

/// In-memory wallet for tests and the mock backend.
#[derive(Clone, Default)]
pub struct MemoryWallet {
    pub identities: Arc<Mutex<HashMap<String, Identity>>>,
}

impl MemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identities.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryWallet {
    fn name(&self) -> &'static str {
        "memory-wallet"
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.identities.lock().unwrap().contains_key(name))
    }

    fn get(&self, name: &str) -> Result<Identity> {
        self.identities
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| WalletError::NotFound(name.to_string()).into())
    }

    fn put(&self, name: &str, identity: &Identity) -> Result<()> {
        let mut identities = self.identities.lock().unwrap();
        if identities.contains_key(name) {
            return Err(WalletError::AlreadyExists(name.to_string()).into());
        }
        identities.insert(name.to_string(), identity.clone());
        Ok(())
    }
}

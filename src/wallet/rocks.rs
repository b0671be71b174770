use anyhow::Result;
use rocksdb::{IteratorMode, Options, DB};
use std::sync::Arc;

use crate::error::WalletError;
use crate::traits::CredentialStore;
use crate::types::Identity;

/// RocksDB-backed wallet: one JSON record per identity name.
pub struct RocksWallet {
    db: Arc<DB>,
}

impl RocksWallet {
    pub fn open(path: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn decode(name: &str, raw: &[u8]) -> Result<Identity> {
        let identity: Identity =
            serde_json::from_slice(raw).map_err(|e| WalletError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(identity)
    }

    /// Names of all stored identities, in key order.
    pub fn names(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for item in self.db.iterator(IteratorMode::Start) {
            let (raw_key, _) = item?;
            out.push(String::from_utf8_lossy(&raw_key).into_owned());
        }
        Ok(out)
    }
}

impl CredentialStore for RocksWallet {
    fn name(&self) -> &'static str {
        "rocksdb-wallet"
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.db.get_pinned(name.as_bytes())?.is_some())
    }

    fn get(&self, name: &str) -> Result<Identity> {
        match self.db.get(name.as_bytes())? {
            Some(raw) => Self::decode(name, &raw),
            None => Err(WalletError::NotFound(name.to_string()).into()),
        }
    }

    fn put(&self, name: &str, identity: &Identity) -> Result<()> {
        if self.exists(name)? {
            return Err(WalletError::AlreadyExists(name.to_string()).into());
        }
        let record = serde_json::to_vec(identity)?;
        self.db.put(name.as_bytes(), record)?;
        tracing::debug!("Stored identity '{}' in wallet", name);
        Ok(())
    }
}

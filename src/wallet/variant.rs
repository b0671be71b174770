use anyhow::Result;

use super::{memory::MemoryWallet, rocks::RocksWallet};
use crate::traits::CredentialStore;
use crate::types::Identity;

/// Enum representing all credential store implementations.
pub enum WalletVariant {
    Rocks(RocksWallet),
    Memory(MemoryWallet),
}

impl CredentialStore for WalletVariant {
    fn name(&self) -> &'static str {
        match self {
            WalletVariant::Rocks(inner) => inner.name(),
            WalletVariant::Memory(inner) => inner.name(),
        }
    }

    fn exists(&self, name: &str) -> Result<bool> {
        match self {
            WalletVariant::Rocks(inner) => inner.exists(name),
            WalletVariant::Memory(inner) => inner.exists(name),
        }
    }

    fn get(&self, name: &str) -> Result<Identity> {
        match self {
            WalletVariant::Rocks(inner) => inner.get(name),
            WalletVariant::Memory(inner) => inner.get(name),
        }
    }

    fn put(&self, name: &str, identity: &Identity) -> Result<()> {
        match self {
            WalletVariant::Rocks(inner) => inner.put(name, identity),
            WalletVariant::Memory(inner) => inner.put(name, identity),
        }
    }
}

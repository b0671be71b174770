pub mod memory;
pub mod rocks;
pub mod variant;

pub use memory::MemoryWallet;
pub use rocks::RocksWallet;
pub use variant::WalletVariant;

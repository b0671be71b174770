// Library exports for testing and external use

pub mod ca;
pub mod classifier;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod profile;
pub mod session;
pub mod telemetry;
pub mod traits;
pub mod transport;
pub mod types;
pub mod wallet;

// Re-export commonly used types and traits
pub use classifier::{classify, Disposition, ErrorKind};
pub use config::{BackendType, BaseConfig, OrchestratorContext};
pub use enrollment::{EnrollmentOutcome, EnrollmentService};
pub use orchestrator::{LedgerOrchestrator, WorkflowState};
pub use session::{Session, SessionManager};
pub use traits::{CertificateAuthority, CredentialStore, LedgerGateway};
pub use types::{AccountId, AccountSnapshot, Identity, TokenMetadata, WorkflowReport};

// Re-export variant enums for convenience
pub use ca::{CertificateAuthorityVariant, MockCertificateAuthority};
pub use gateway::{GatewayVariant, MockLedger};
pub use wallet::{MemoryWallet, RocksWallet, WalletVariant};

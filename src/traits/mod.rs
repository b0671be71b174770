pub mod certificate_authority;
pub mod credential_store;
pub mod ledger_gateway;

pub use certificate_authority::CertificateAuthority;
pub use credential_store::CredentialStore;
pub use ledger_gateway::ConnectOptions;
pub use ledger_gateway::GatewayConnection;
pub use ledger_gateway::LedgerGateway;

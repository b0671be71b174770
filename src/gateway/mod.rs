pub mod http;
pub mod mock;
pub mod token_contract;
pub mod variant;

pub use http::HttpGateway;
pub use mock::MockLedger;
pub use token_contract::TokenContract;
pub use variant::GatewayVariant;

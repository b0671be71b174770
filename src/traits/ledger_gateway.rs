use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Identity;

/// Where to bind a new connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub channel: String,
    pub contract: String,
    /// Use peer discovery to locate endorsers.
    pub discovery: bool,
    /// Rewrite discovered peer addresses to localhost.
    pub as_localhost: bool,
}

/// Handle to one open connection, bound to one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConnection {
    pub id: String,
    pub identity: String,
    pub channel: String,
    pub contract: String,
}

/// Remote ledger network hosting the token contract.
///
/// Failures are raised as `GatewayError`.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Gateway name for logging.
    fn name(&self) -> &'static str;

    /// Open a connection authenticated as `identity`.
    async fn connect(&self, identity: &Identity, options: &ConnectOptions) -> Result<GatewayConnection>;

    /// Durable write. Resolves once the transaction is committed.
    async fn submit(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>>;

    /// Read-only query. No commit wait.
    async fn evaluate(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>>;

    /// Release the connection. Closing an unknown or dead connection is not an error.
    async fn disconnect(&self, connection: &GatewayConnection) -> Result<()>;
}

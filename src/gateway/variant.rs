use anyhow::Result;
use async_trait::async_trait;

use super::{http::HttpGateway, mock::MockLedger};
use crate::traits::{ConnectOptions, GatewayConnection, LedgerGateway};
use crate::types::Identity;

/// Enum representing all ledger gateway implementations.
pub enum GatewayVariant {
    Http(HttpGateway),
    Mock(MockLedger),
}

#[async_trait]
impl LedgerGateway for GatewayVariant {
    fn name(&self) -> &'static str {
        match self {
            GatewayVariant::Http(inner) => inner.name(),
            GatewayVariant::Mock(inner) => inner.name(),
        }
    }

    async fn connect(&self, identity: &Identity, options: &ConnectOptions) -> Result<GatewayConnection> {
        match self {
            GatewayVariant::Http(inner) => inner.connect(identity, options).await,
            GatewayVariant::Mock(inner) => inner.connect(identity, options).await,
        }
    }

    async fn submit(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        match self {
            GatewayVariant::Http(inner) => inner.submit(connection, transaction, args).await,
            GatewayVariant::Mock(inner) => inner.submit(connection, transaction, args).await,
        }
    }

    async fn evaluate(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        match self {
            GatewayVariant::Http(inner) => inner.evaluate(connection, transaction, args).await,
            GatewayVariant::Mock(inner) => inner.evaluate(connection, transaction, args).await,
        }
    }

    async fn disconnect(&self, connection: &GatewayConnection) -> Result<()> {
        match self {
            GatewayVariant::Http(inner) => inner.disconnect(connection).await,
            GatewayVariant::Mock(inner) => inner.disconnect(connection).await,
        }
    }
}

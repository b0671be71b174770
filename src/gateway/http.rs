use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hyper::header::HeaderName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GatewayError;
use crate::traits::{ConnectOptions, GatewayConnection, LedgerGateway};
use crate::transport::{JsonClient, TransportFailure};
use crate::types::{EndorsementDetail, Identity};

const CONNECTION_HEADER: &str = "x-gateway-connection";

/// Client for a local ledger gateway sidecar.
///
/// The sidecar holds the peer connections and signs on behalf of the
/// identity presented at connect time, so it must be reachable only over a
/// trusted local link.
///
/// # Protocol
/// - POST /api/v1/connect - `{identity, mspId, certificate, privateKey,
///   channel, contract, discovery, asLocalhost}` -> `{connectionId}`
/// - POST /api/v1/submit, /api/v1/evaluate - `{transaction, arguments}` ->
///   `{result}` (base64)
/// - POST /api/v1/disconnect - `{connectionId}`
///
/// Failures come back as `{error: {kind, message, endorsements}}` where
/// `kind` is one of `connection`, `endorsement`, `evaluation`.
pub struct HttpGateway {
    client: JsonClient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectBody<'a> {
    identity: &'a str,
    msp_id: &'a str,
    certificate: String,
    private_key: String,
    channel: &'a str,
    contract: &'a str,
    discovery: bool,
    as_localhost: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResult {
    connection_id: String,
}

#[derive(Debug, Serialize)]
struct TransactionBody<'a> {
    transaction: &'a str,
    arguments: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisconnectBody<'a> {
    connection_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct Reply<T> {
    result: Option<T>,
    error: Option<ReplyError>,
}

#[derive(Debug, Deserialize)]
struct ReplyError {
    kind: String,
    message: String,
    #[serde(default)]
    endorsements: Vec<EndorsementDetail>,
}

impl HttpGateway {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: JsonClient::new(url, timeout),
        }
    }

    async fn call<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        transaction: &str,
        connection: Option<&GatewayConnection>,
        body: &B,
    ) -> Result<Option<T>, GatewayError> {
        let headers: Vec<(HeaderName, String)> = connection
            .map(|c| vec![(HeaderName::from_static(CONNECTION_HEADER), c.id.clone())])
            .unwrap_or_default();

        let reply = self
            .client
            .post(path, &headers, body)
            .await
            .map_err(|TransportFailure(reason)| GatewayError::Connection(reason))?;

        let parsed: Reply<T> = serde_json::from_slice(&reply.body).map_err(|e| {
            GatewayError::InvalidResponse(format!("status {}: {}", reply.status, e))
        })?;

        match parsed.error {
            None if reply.status.is_success() => Ok(parsed.result),
            None => Err(GatewayError::InvalidResponse(format!(
                "status {} without error detail",
                reply.status
            ))),
            Some(err) => Err(match err.kind.as_str() {
                "connection" => GatewayError::Connection(err.message),
                "endorsement" => GatewayError::Endorsement {
                    transaction: transaction.to_string(),
                    message: err.message,
                    endorsements: err.endorsements,
                },
                "evaluation" => GatewayError::Evaluation {
                    transaction: transaction.to_string(),
                    message: err.message,
                },
                other => GatewayError::InvalidResponse(format!("unknown error kind '{}': {}", other, err.message)),
            }),
        }
    }

    async fn invoke(
        &self,
        path: &str,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let body = TransactionBody {
            transaction,
            arguments: args,
        };
        let encoded: Option<String> = self.call(path, transaction, Some(connection), &body).await?;
        match encoded {
            Some(value) => Ok(STANDARD.decode(value).map_err(|e| {
                GatewayError::InvalidResponse(format!("result of '{}' is not base64: {}", transaction, e))
            })?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl LedgerGateway for HttpGateway {
    fn name(&self) -> &'static str {
        "http-gateway"
    }

    async fn connect(&self, identity: &Identity, options: &ConnectOptions) -> Result<GatewayConnection> {
        let body = ConnectBody {
            identity: &identity.name,
            msp_id: &identity.msp_id,
            certificate: STANDARD.encode(&identity.certificate),
            private_key: STANDARD.encode(&identity.private_key),
            channel: &options.channel,
            contract: &options.contract,
            discovery: options.discovery,
            as_localhost: options.as_localhost,
        };
        let result: Option<ConnectResult> = self.call("/api/v1/connect", "connect", None, &body).await?;
        let result = result.ok_or_else(|| GatewayError::InvalidResponse("missing connectionId".to_string()))?;

        Ok(GatewayConnection {
            id: result.connection_id,
            identity: identity.name.clone(),
            channel: options.channel.clone(),
            contract: options.contract.clone(),
        })
    }

    async fn submit(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        self.invoke("/api/v1/submit", connection, transaction, args).await
    }

    async fn evaluate(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        self.invoke("/api/v1/evaluate", connection, transaction, args).await
    }

    async fn disconnect(&self, connection: &GatewayConnection) -> Result<()> {
        let body = DisconnectBody {
            connection_id: &connection.id,
        };
        let _: Option<serde_json::Value> = self
            .call("/api/v1/disconnect", "disconnect", Some(connection), &body)
            .await?;
        Ok(())
    }
}

//! One authenticated ledger session at a time.
//!
//! `SessionManager` owns the only live `Session`. Callers borrow it; a new
//! identity can only be connected after the current one is disconnected.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::OrchestratorContext;
use crate::error::SessionError;
use crate::gateway::GatewayVariant;
use crate::traits::{ConnectOptions, GatewayConnection, LedgerGateway};
use crate::types::Identity;

/// Connection bound to one identity, exposing the contract calls.
pub struct Session {
    identity: Identity,
    connection: GatewayConnection,
    gateway: Arc<GatewayVariant>,
}

impl Session {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connection(&self) -> &GatewayConnection {
        &self.connection
    }

    /// Durable write; resolves after commit.
    pub async fn submit(&self, transaction: &str, args: &[String]) -> Result<Vec<u8>> {
        debug!("submit {}{:?} as '{}'", transaction, args, self.identity.name);
        self.gateway
            .submit(&self.connection, transaction, args)
            .await
            .with_context(|| format!("submitting {} as '{}'", transaction, self.identity.name))
    }

    /// Read-only query.
    pub async fn evaluate(&self, transaction: &str, args: &[String]) -> Result<Vec<u8>> {
        debug!("evaluate {}{:?} as '{}'", transaction, args, self.identity.name);
        self.gateway
            .evaluate(&self.connection, transaction, args)
            .await
            .with_context(|| format!("evaluating {} as '{}'", transaction, self.identity.name))
    }
}

pub struct SessionManager {
    gateway: Arc<GatewayVariant>,
    options: ConnectOptions,
    active: Option<Session>,
}

impl SessionManager {
    pub fn new(gateway: GatewayVariant, context: &OrchestratorContext) -> Self {
        Self {
            gateway: Arc::new(gateway),
            options: context.connect.clone(),
            active: None,
        }
    }

    /// Open a session as `identity`. Rejected while another session is open.
    pub async fn connect_as(&mut self, identity: &Identity) -> Result<&Session> {
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyConnected {
                active: active.identity.name.clone(),
                requested: identity.name.clone(),
            }
            .into());
        }

        let connection = self
            .gateway
            .connect(identity, &self.options)
            .await
            .with_context(|| format!("connecting as '{}'", identity.name))?;
        info!(
            "Connected as '{}' to {}/{} via {}",
            identity.name,
            connection.channel,
            connection.contract,
            self.gateway.name()
        );

        Ok(&*self.active.insert(Session {
            identity: identity.clone(),
            connection,
            gateway: Arc::clone(&self.gateway),
        }))
    }

    /// Release the open session, if any. Never fails.
    pub async fn disconnect(&mut self) {
        let Some(session) = self.active.take() else {
            return;
        };
        match self.gateway.disconnect(&session.connection).await {
            Ok(()) => debug!("Disconnected '{}'", session.identity.name),
            Err(e) => warn!("Disconnect of '{}' failed: {:#}", session.identity.name, e),
        }
    }

    /// Disconnect the current session, then connect as `identity`.
    pub async fn switch_to(&mut self, identity: &Identity) -> Result<&Session> {
        self.disconnect().await;
        self.connect_as(identity).await
    }

    pub fn current(&self) -> Result<&Session> {
        self.active
            .as_ref()
            .ok_or_else(|| SessionError::NotConnected.into())
    }

    pub fn active_identity(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.identity.name.as_str())
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }
}

//! Typed failures raised by the adapters and components.
//!
//! Everything travels as `anyhow::Error`; `crate::classifier` recovers these
//! types by downcasting along the error chain.

use thiserror::Error;

use crate::types::EndorsementDetail;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("identity '{0}' not found in wallet")]
    NotFound(String),

    #[error("identity '{0}' already exists in wallet")]
    AlreadyExists(String),

    #[error("wallet record for '{name}' is unreadable: {reason}")]
    Corrupt { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CaError {
    #[error("certificate authority unreachable: {0}")]
    Unreachable(String),

    /// The enrollment ID is already known to the authority.
    #[error("identity '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("certificate authority rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("invalid certificate authority response: {0}")]
    InvalidResponse(String),
}

/// A failed enrollment or registration for one identity.
#[derive(Debug, Error)]
#[error("enrollment failed for '{identity}'")]
pub struct EnrollmentFailure {
    pub identity: String,
    #[source]
    pub source: CaError,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport or discovery failure; no contract interaction is possible.
    #[error("ledger connection failed: {0}")]
    Connection(String),

    /// Peers refused to endorse a submitted transaction.
    #[error("transaction '{transaction}' was not endorsed: {message}")]
    Endorsement {
        transaction: String,
        message: String,
        endorsements: Vec<EndorsementDetail>,
    },

    /// An evaluate call returned an error from the contract.
    #[error("evaluation of '{transaction}' failed: {message}")]
    Evaluation { transaction: String, message: String },

    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session for '{active}' is still open; disconnect before connecting as '{requested}'")]
    AlreadyConnected { active: String, requested: String },

    #[error("no open session")]
    NotConnected,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("'{0}' is registered at the authority but has no local credential")]
    MissingCredential(String),

    #[error("'{transaction}' returned a non-numeric amount: {raw:?}")]
    InvalidAmount { transaction: String, raw: String },

    #[error("ClientAccountID returned an empty id for '{0}'")]
    EmptyAccountId(String),

    #[error("at least one counterparty is required")]
    NoCounterparties,
}

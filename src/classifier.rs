//! Single place where raw failures are mapped to skip / initialize / abort.
//!
//! Callers hand over `anyhow::Error`s; the typed causes from `crate::error`
//! are found by walking the error chain. No message text is inspected.

use anyhow::Result;
use tracing::debug;

use crate::error::{CaError, GatewayError, SessionError, WalletError};
use crate::types::EndorsementDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The wallet already holds the identity.
    IdentityAlreadyLocal,
    /// The authority already knows the enrollment ID.
    AlreadyRegisteredRemotely,
    /// Reading the token name found no token metadata.
    ContractNotInitialized,
    /// Peers rejected a submitted transaction.
    EndorsementFailure,
    /// Transport or discovery failure.
    ConnectionFailure,
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Skip,
    Initialize,
    Abort,
}

impl ErrorKind {
    pub fn disposition(self) -> Disposition {
        match self {
            ErrorKind::IdentityAlreadyLocal | ErrorKind::AlreadyRegisteredRemotely => {
                Disposition::Skip
            }
            ErrorKind::ContractNotInitialized => Disposition::Initialize,
            ErrorKind::EndorsementFailure
            | ErrorKind::ConnectionFailure
            | ErrorKind::Unclassified => Disposition::Abort,
        }
    }

    pub fn is_benign(self) -> bool {
        self.disposition() != Disposition::Abort
    }
}

/// Classify a failure from any component.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<WalletError>() {
            if let WalletError::AlreadyExists(_) = e {
                return ErrorKind::IdentityAlreadyLocal;
            }
        }
        if let Some(e) = cause.downcast_ref::<CaError>() {
            match e {
                CaError::AlreadyRegistered(_) => return ErrorKind::AlreadyRegisteredRemotely,
                CaError::Unreachable(_) => return ErrorKind::ConnectionFailure,
                _ => {}
            }
        }
        if let Some(e) = cause.downcast_ref::<GatewayError>() {
            match e {
                GatewayError::Connection(_) => return ErrorKind::ConnectionFailure,
                GatewayError::Endorsement { .. } => return ErrorKind::EndorsementFailure,
                _ => {}
            }
        }
    }
    ErrorKind::Unclassified
}

/// True when an evaluate call was answered by the contract with a rejection,
/// as opposed to failing in transport or through session misuse.
fn is_contract_read_rejection(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if cause.downcast_ref::<SessionError>().is_some() {
            return false;
        }
        if let Some(GatewayError::Evaluation { .. }) = cause.downcast_ref::<GatewayError>() {
            return true;
        }
    }
    false
}

/// Interpret the `TokenName` read that guards `Initialize`.
///
/// Returns the token name when the contract is initialized, `None` when it
/// must be initialized, and the original error when the run must abort.
pub fn read_token_name(result: Result<Vec<u8>>) -> Result<Option<String>> {
    match result {
        Ok(bytes) => {
            let name = String::from_utf8_lossy(&bytes).trim().to_string();
            if name.is_empty() {
                debug!(kind = ?ErrorKind::ContractNotInitialized, "TokenName is empty");
                Ok(None)
            } else {
                Ok(Some(name))
            }
        }
        Err(err) => {
            let kind = if is_contract_read_rejection(&err) {
                ErrorKind::ContractNotInitialized
            } else {
                classify(&err)
            };
            match kind.disposition() {
                Disposition::Initialize => {
                    debug!(kind = ?kind, "TokenName read rejected: {:#}", err);
                    Ok(None)
                }
                _ => Err(err),
            }
        }
    }
}

/// Treat a contract-level read rejection (e.g. an account that does not
/// exist yet) as an absent value. Other failures propagate.
pub fn optional_read(result: Result<Vec<u8>>) -> Result<Option<Vec<u8>>> {
    match result {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if is_contract_read_rejection(&err) => {
            debug!("read rejected by contract: {:#}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Per-endorser detail carried by an endorsement failure, if any.
pub fn endorsement_details(err: &anyhow::Error) -> Option<&[EndorsementDetail]> {
    err.chain().find_map(|cause| match cause.downcast_ref::<GatewayError>() {
        Some(GatewayError::Endorsement { endorsements, .. }) => Some(endorsements.as_slice()),
        _ => None,
    })
}

/// Diagnostic printed when a command aborts: message, kind, per-endorser
/// detail, then the full cause chain.
pub fn failure_report(err: &anyhow::Error) -> String {
    let kind = classify(err);
    let mut lines = vec![format!("Error: {:#}", err), format!("Kind: {:?}", kind)];
    if let Some(details) = endorsement_details(err) {
        lines.extend(details.iter().map(|detail| format!("  endorsement {}", detail)));
    }
    lines.push(format!("{:?}", err));
    lines.join("\n")
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential kind. Only X.509 identities are issued by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityKind {
    #[serde(rename = "X.509")]
    X509,
}

/// A named credential usable to authenticate to the ledger network.
///
/// Serialized as the wallet record `{name, mspId, certificate,
/// privateKeyBytes, type}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Unique wallet key.
    pub name: String,
    /// Organization (MSP) the identity belongs to.
    pub msp_id: String,
    /// PEM-encoded certificate.
    pub certificate: Vec<u8>,
    /// PEM-encoded private key.
    #[serde(rename = "privateKeyBytes")]
    pub private_key: Vec<u8>,
    #[serde(rename = "type")]
    pub kind: IdentityKind,
}

impl Identity {
    pub fn x509(
        name: impl Into<String>,
        msp_id: impl Into<String>,
        material: EnrollmentMaterial,
    ) -> Self {
        Self {
            name: name.into(),
            msp_id: msp_id.into(),
            certificate: material.certificate,
            private_key: material.key,
            kind: IdentityKind::X509,
        }
    }
}

// Keeps key bytes out of logs.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("msp_id", &self.msp_id)
            .field("certificate_len", &self.certificate.len())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Certificate and key returned by a successful enrollment.
#[derive(Clone, PartialEq, Eq)]
pub struct EnrollmentMaterial {
    pub certificate: Vec<u8>,
    pub key: Vec<u8>,
}

impl fmt::Debug for EnrollmentMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrollmentMaterial")
            .field("certificate_len", &self.certificate.len())
            .finish_non_exhaustive()
    }
}

/// Registration request sent to the certificate authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Enrollment ID to pre-authorize.
    pub enrollment_id: String,
    pub affiliation: String,
    pub role: String,
    /// Fixed secret to register with. `None` lets the authority generate one.
    pub secret: Option<String>,
}

/// Ledger-side account identifier derived from an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token metadata set once by `Initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "LoyaltyPoints".to_string(),
            symbol: "LPT".to_string(),
            decimals: 2,
        }
    }
}

/// Per-peer response attached to a rejected submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementDetail {
    pub peer: String,
    pub status: u16,
    pub message: String,
}

impl fmt::Display for EndorsementDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {}): {}", self.peer, self.status, self.message)
    }
}

/// Balances observed after a transfer to one counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    pub counterparty: String,
    pub account_id: AccountId,
    pub admin_balance: u64,
    pub counterparty_balance: u64,
}

/// Everything the workflow observed, in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Token name read back or just initialized.
    pub token_name: String,
    /// False when `TokenName` showed the contract was already set up.
    pub initialized_now: bool,
    pub total_supply_after_mint: u64,
    pub admin_account_id: Option<AccountId>,
    pub admin_balance_after_mint: u64,
    pub distributions: Vec<DistributionRecord>,
    /// Counterparty that approved the admin as spender.
    pub approver: Option<String>,
    pub final_admin_balance: u64,
    pub final_approver_balance: u64,
}

/// Read-only view of the ledger as seen by one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub identity: String,
    /// `None` when the contract is not initialized.
    pub token_name: Option<String>,
    pub total_supply: Option<u64>,
    pub account_id: Option<AccountId>,
    /// `None` when the account has never held tokens.
    pub balance: Option<u64>,
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::profile::ConnectionProfile;
use crate::traits::ConnectOptions;
use crate::types::TokenMetadata;

/// Which adapters back the certificate authority and the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum BackendType {
    /// Remote CA and gateway over HTTP.
    Http,
    /// In-memory CA and token contract.
    Mock,
}

/// Base configuration for the orchestrator.
/// Every field is a CLI flag with a `LOYALTY_*` environment fallback.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Path of the RocksDB wallet.
    #[arg(long, env = "LOYALTY_WALLET_PATH", default_value = "./wallet")]
    pub wallet_path: String,

    #[arg(long, env = "LOYALTY_BACKEND", value_enum, default_value = "http")]
    pub backend: BackendType,

    /// Connection profile JSON; overrides the CA endpoint when given.
    #[arg(long, env = "LOYALTY_CONNECTION_PROFILE")]
    pub connection_profile: Option<PathBuf>,

    #[arg(long, env = "LOYALTY_CA_URL", default_value = "http://localhost:7054")]
    pub ca_url: String,

    #[arg(long, env = "LOYALTY_CA_NAME", default_value = "ca.org1.example.com")]
    pub ca_name: String,

    /// PEM roots trusted for an `https` CA URL, taken from the connection profile.
    #[arg(skip)]
    #[serde(default)]
    pub ca_tls_roots: Vec<String>,

    #[arg(long, env = "LOYALTY_GATEWAY_URL", default_value = "http://localhost:7070")]
    pub gateway_url: String,

    #[arg(long, env = "LOYALTY_CHANNEL", default_value = "loyaltychannel")]
    pub channel: String,

    #[arg(long, env = "LOYALTY_CONTRACT", default_value = "loyaltypoints")]
    pub contract: String,

    #[arg(long, env = "LOYALTY_MSP_ID", default_value = "Org1MSP")]
    pub msp_id: String,

    #[arg(long, env = "LOYALTY_ADMIN_ID", default_value = "admin")]
    pub admin_id: String,

    /// Bootstrap secret of the CA registrar.
    #[arg(long, env = "LOYALTY_ADMIN_SECRET", default_value = "adminpw", hide_env_values = true)]
    pub admin_secret: String,

    #[arg(long, env = "LOYALTY_AFFILIATION", default_value = "org1.department1")]
    pub affiliation: String,

    #[arg(long, env = "LOYALTY_COUNTERPARTY_ROLE", default_value = "client")]
    pub counterparty_role: String,

    /// Fixed secret to register counterparties with. Lets a counterparty that
    /// is already registered at the CA still be enrolled.
    #[arg(long, env = "LOYALTY_COUNTERPARTY_SECRET", hide_env_values = true)]
    pub counterparty_secret: Option<String>,

    /// Per-request timeout of the HTTP adapters.
    #[arg(long, env = "LOYALTY_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "LOYALTY_AS_LOCALHOST", default_value_t = true, action = clap::ArgAction::Set)]
    pub as_localhost: bool,

    #[arg(long, default_value = "LoyaltyPoints")]
    pub token_name: String,

    #[arg(long, default_value = "LPT")]
    pub token_symbol: String,

    #[arg(long, default_value_t = 2)]
    pub token_decimals: u8,

    #[arg(long, default_value_t = 1000)]
    pub mint_amount: u64,

    #[arg(long, default_value_t = 500)]
    pub transfer_amount: u64,

    #[arg(long, default_value_t = 200)]
    pub allowance_amount: u64,

    /// Counterparties in processing order; the first one approves the admin.
    #[arg(
        long = "counterparty",
        value_delimiter = ',',
        default_values_t = ["customer1".to_string(), "customer2".to_string()]
    )]
    pub counterparties: Vec<String>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        let token = TokenMetadata::default();
        BaseConfig {
            wallet_path: "./wallet".to_string(),
            backend: BackendType::Http,
            connection_profile: None,
            ca_url: "http://localhost:7054".to_string(),
            ca_name: "ca.org1.example.com".to_string(),
            ca_tls_roots: Vec::new(),
            gateway_url: "http://localhost:7070".to_string(),
            channel: "loyaltychannel".to_string(),
            contract: "loyaltypoints".to_string(),
            msp_id: "Org1MSP".to_string(),
            admin_id: "admin".to_string(),
            admin_secret: "adminpw".to_string(),
            affiliation: "org1.department1".to_string(),
            counterparty_role: "client".to_string(),
            counterparty_secret: None,
            request_timeout_secs: 30,
            as_localhost: true,
            token_name: token.name,
            token_symbol: token.symbol,
            token_decimals: token.decimals,
            mint_amount: 1000,
            transfer_amount: 500,
            allowance_amount: 200,
            counterparties: vec!["customer1".to_string(), "customer2".to_string()],
        }
    }
}

impl BaseConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply the connection profile, if one is configured.
    pub fn resolve_profile(&mut self) -> Result<()> {
        let Some(path) = self.connection_profile.clone() else {
            return Ok(());
        };
        let profile = ConnectionProfile::load(&path)
            .with_context(|| format!("loading connection profile {}", path.display()))?;
        let ca = profile.certificate_authority(&self.ca_name)?;
        self.ca_url = ca.url.clone();
        if let Some(ca_name) = &ca.ca_name {
            self.ca_name = ca_name.clone();
        }
        self.ca_tls_roots = ca.tls_roots();
        tracing::info!("CA endpoint from connection profile: {} ({})", self.ca_url, self.ca_name);
        Ok(())
    }

    /// Explicit context handed to every component.
    pub fn context(&self) -> OrchestratorContext {
        OrchestratorContext {
            wallet_path: self.wallet_path.clone(),
            msp_id: self.msp_id.clone(),
            admin_id: self.admin_id.clone(),
            admin_secret: self.admin_secret.clone(),
            affiliation: self.affiliation.clone(),
            counterparty_role: self.counterparty_role.clone(),
            counterparty_secret: self.counterparty_secret.clone(),
            connect: ConnectOptions {
                channel: self.channel.clone(),
                contract: self.contract.clone(),
                discovery: true,
                as_localhost: self.as_localhost,
            },
            token: TokenMetadata {
                name: self.token_name.clone(),
                symbol: self.token_symbol.clone(),
                decimals: self.token_decimals,
            },
            mint_amount: self.mint_amount,
            transfer_amount: self.transfer_amount,
            allowance_amount: self.allowance_amount,
            counterparties: self.counterparties.clone(),
        }
    }
}

/// Fixed parameters of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorContext {
    pub wallet_path: String,
    pub msp_id: String,
    pub admin_id: String,
    pub admin_secret: String,
    pub affiliation: String,
    pub counterparty_role: String,
    pub counterparty_secret: Option<String>,
    pub connect: ConnectOptions,
    pub token: TokenMetadata,
    pub mint_amount: u64,
    pub transfer_amount: u64,
    pub allowance_amount: u64,
    pub counterparties: Vec<String>,
}

impl Default for OrchestratorContext {
    fn default() -> Self {
        BaseConfig::default().context()
    }
}

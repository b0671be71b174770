//! Core LedgerOrchestrator struct and initialization - no workflow logic.

use std::fmt;

use anyhow::Result;
use tracing::info;

use crate::ca::{CertificateAuthorityVariant, HttpCertificateAuthority, MockCertificateAuthority};
use crate::config::{BackendType, BaseConfig, OrchestratorContext};
use crate::enrollment::EnrollmentService;
use crate::gateway::{GatewayVariant, HttpGateway, MockLedger};
use crate::session::SessionManager;
use crate::types::WorkflowReport;
use crate::wallet::{MemoryWallet, RocksWallet, WalletVariant};

/// Workflow position. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    /// Admin enrolled and connected.
    AdminReady,
    /// Token metadata present on the ledger.
    Initialized,
    /// Supply minted to the admin.
    Funded,
    /// This many counterparties have received their transfer.
    Distributed(usize),
    /// First counterparty approved the admin as spender.
    Approved,
    /// Delegated transfer done and balances read.
    Settled,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Distributed(n) => write!(f, "Distributed({})", n),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Drives the loyalty workflow against one ledger, one identity at a time.
pub struct LedgerOrchestrator {
    /// Wallet plus certificate authority.
    pub enrollment: EnrollmentService,

    /// Owner of the single live session.
    pub sessions: SessionManager,

    /// Fixed parameters of this run.
    pub context: OrchestratorContext,

    pub(crate) state: WorkflowState,

    /// Every state entered, in order, starting with `Start`.
    pub(crate) history: Vec<WorkflowState>,

    pub(crate) report: WorkflowReport,
}

impl LedgerOrchestrator {
    pub fn new(enrollment: EnrollmentService, sessions: SessionManager, context: OrchestratorContext) -> Self {
        Self {
            enrollment,
            sessions,
            context,
            state: WorkflowState::Start,
            history: vec![WorkflowState::Start],
            report: WorkflowReport::default(),
        }
    }

    /// Build adapters for the configured backend.
    ///
    /// The mock backend keeps its wallet in memory: its authority forgets
    /// every enrollment when the process exits.
    pub fn initialize(config: &BaseConfig) -> Result<Self> {
        let context = config.context();

        let (wallet, ca, gateway) = match config.backend {
            BackendType::Http => {
                let wallet = RocksWallet::open(&context.wallet_path)?;
                info!("Wallet opened at: {}", context.wallet_path);
                let ca = HttpCertificateAuthority::new(
                    config.ca_url.clone(),
                    config.ca_name.clone(),
                    config.request_timeout(),
                    &config.ca_tls_roots,
                )?;
                let gateway = HttpGateway::new(config.gateway_url.clone(), config.request_timeout());
                (
                    WalletVariant::Rocks(wallet),
                    CertificateAuthorityVariant::Http(ca),
                    GatewayVariant::Http(gateway),
                )
            }
            BackendType::Mock => {
                info!("Using in-memory wallet, authority and ledger");
                (
                    WalletVariant::Memory(MemoryWallet::new()),
                    CertificateAuthorityVariant::Mock(MockCertificateAuthority::new(
                        &config.admin_id,
                        &config.admin_secret,
                    )),
                    GatewayVariant::Mock(MockLedger::new(&config.msp_id)),
                )
            }
        };

        let enrollment = EnrollmentService::new(wallet, ca, context.clone());
        let sessions = SessionManager::new(gateway, &context);
        Ok(Self::new(enrollment, sessions, context))
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn history(&self) -> &[WorkflowState] {
        &self.history
    }

    /// Observations so far; complete once the state is `Settled`.
    pub fn report(&self) -> &WorkflowReport {
        &self.report
    }

    pub(crate) fn advance(&mut self, next: WorkflowState) {
        info!("Workflow {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}

//! Workflow steps. Each step performs one transition and records what it
//! observed; `run` sequences them and always releases the session.

use anyhow::Result;
use tracing::{info, info_span, warn, Instrument};

use super::core::{LedgerOrchestrator, WorkflowState};
use crate::classifier::{self, endorsement_details};
use crate::enrollment::EnrollmentOutcome;
use crate::error::WorkflowError;
use crate::session::Session;
use crate::traits::CredentialStore;
use crate::types::{AccountId, AccountSnapshot, DistributionRecord, Identity, WorkflowReport};

impl LedgerOrchestrator {
    /// Run the whole workflow from `Start` to `Settled`.
    ///
    /// The live session is disconnected whether the workflow succeeds or aborts.
    pub async fn run(&mut self) -> Result<WorkflowReport> {
        let span = info_span!("workflow", channel = %self.context.connect.channel);
        let result = self.run_steps().instrument(span).await;
        self.sessions.disconnect().await;

        match &result {
            Ok(_) => info!("Loyalty workflow complete"),
            Err(err) => {
                warn!("Workflow aborted in state {}: {:#}", self.state, err);
                if let Some(details) = endorsement_details(err) {
                    for detail in details {
                        warn!("endorsement: {}", detail);
                    }
                }
            }
        }
        result
    }

    async fn run_steps(&mut self) -> Result<WorkflowReport> {
        if self.context.counterparties.is_empty() {
            return Err(WorkflowError::NoCounterparties.into());
        }

        let admin = self.ensure_admin().await?;
        self.ensure_initialized().await?;
        let admin_account = self.fund().await?;

        let counterparties = self.context.counterparties.clone();
        let mut approver: Option<(Identity, AccountId)> = None;
        for name in &counterparties {
            let (identity, account) = self.distribute_to(&admin, name).await?;
            if approver.is_none() {
                approver = Some((identity, account));
            }
        }
        let (approver, approver_account) = approver.ok_or(WorkflowError::NoCounterparties)?;

        self.approve(&approver, &admin_account).await?;
        self.settle(&admin, &approver, &approver_account, &admin_account).await?;
        Ok(self.report.clone())
    }

    /// Start -> AdminReady: admin in the wallet and connected.
    pub async fn ensure_admin(&mut self) -> Result<Identity> {
        let admin = match self.enrollment.enroll_admin().await? {
            EnrollmentOutcome::Enrolled(identity) | EnrollmentOutcome::AlreadyPresent(identity) => identity,
            EnrollmentOutcome::RegisteredRemotely => {
                return Err(WorkflowError::MissingCredential(self.context.admin_id.clone()).into())
            }
        };
        self.sessions.switch_to(&admin).await?;
        self.advance(WorkflowState::AdminReady);
        Ok(admin)
    }

    /// AdminReady -> Initialized. `Initialize` is submitted only when the
    /// `TokenName` read shows no metadata.
    pub async fn ensure_initialized(&mut self) -> Result<()> {
        let session = self.sessions.current()?;
        let existing = classifier::read_token_name(session.evaluate("TokenName", &[]).await)?;

        let token_name = match existing {
            Some(name) => {
                info!("Contract already initialized with name: {}", name);
                self.report.initialized_now = false;
                name
            }
            None => {
                let token = &self.context.token;
                info!("Initializing contract: {} ({}), decimals {}", token.name, token.symbol, token.decimals);
                session
                    .submit(
                        "Initialize",
                        &[token.name.clone(), token.symbol.clone(), token.decimals.to_string()],
                    )
                    .await?;
                self.report.initialized_now = true;
                token.name.clone()
            }
        };

        self.report.token_name = token_name;
        self.advance(WorkflowState::Initialized);
        Ok(())
    }

    /// Initialized -> Funded: mint to the admin and read back supply and balance.
    pub async fn fund(&mut self) -> Result<AccountId> {
        let amount = self.context.mint_amount;
        let session = self.sessions.current()?;

        info!("Minting {} points for '{}'", amount, session.identity().name);
        session.submit("Mint", &[amount.to_string()]).await?;

        let total_supply = read_amount(session, "TotalSupply", &[]).await?;
        let admin_account = read_own_account(session).await?;
        let admin_balance = read_amount(session, "ClientAccountBalance", &[]).await?;
        info!(
            "Total supply: {}, admin account: {}, admin balance: {}",
            total_supply, admin_account, admin_balance
        );

        self.report.total_supply_after_mint = total_supply;
        self.report.admin_account_id = Some(admin_account.clone());
        self.report.admin_balance_after_mint = admin_balance;
        self.advance(WorkflowState::Funded);
        Ok(admin_account)
    }

    /// One counterparty, fully: enroll, learn its own account id as itself,
    /// transfer to it as admin, read both balances.
    pub async fn distribute_to(&mut self, admin: &Identity, name: &str) -> Result<(Identity, AccountId)> {
        let identity = self
            .enrollment
            .register_and_enroll(name, admin)
            .await?
            .into_identity()
            .ok_or_else(|| WorkflowError::MissingCredential(name.to_string()))?;

        let session = self.sessions.switch_to(&identity).await?;
        let account = read_own_account(session).await?;

        let amount = self.context.transfer_amount;
        let session = self.sessions.switch_to(admin).await?;
        info!("Transferring {} points to '{}'", amount, name);
        session
            .submit("Transfer", &[account.0.clone(), amount.to_string()])
            .await?;

        let admin_balance = read_amount(session, "ClientAccountBalance", &[]).await?;
        let counterparty_balance = read_amount(session, "BalanceOf", &[account.0.clone()]).await?;
        info!(
            "Admin balance after transfer: {}, '{}' balance: {}",
            admin_balance, name, counterparty_balance
        );

        self.report.distributions.push(DistributionRecord {
            counterparty: name.to_string(),
            account_id: account.clone(),
            admin_balance,
            counterparty_balance,
        });
        let distributed = self.report.distributions.len();
        self.advance(WorkflowState::Distributed(distributed));
        Ok((identity, account))
    }

    /// Distributed -> Approved: `owner` lets `spender` move the allowance amount.
    pub async fn approve(&mut self, owner: &Identity, spender: &AccountId) -> Result<()> {
        let amount = self.context.allowance_amount;
        let session = self.sessions.switch_to(owner).await?;
        info!("'{}' approving {} to spend {} points", owner.name, spender, amount);
        session
            .submit("Approve", &[spender.0.clone(), amount.to_string()])
            .await?;

        self.report.approver = Some(owner.name.clone());
        self.advance(WorkflowState::Approved);
        Ok(())
    }

    /// Approved -> Settled: admin pulls the allowance from the approver.
    pub async fn settle(
        &mut self,
        admin: &Identity,
        approver: &Identity,
        approver_account: &AccountId,
        admin_account: &AccountId,
    ) -> Result<()> {
        let amount = self.context.allowance_amount;
        let session = self.sessions.switch_to(admin).await?;
        session
            .submit(
                "TransferFrom",
                &[approver_account.0.clone(), admin_account.0.clone(), amount.to_string()],
            )
            .await?;
        info!("Admin deducted {} points from '{}' via approval", amount, approver.name);

        let admin_balance = read_amount(session, "BalanceOf", &[admin_account.0.clone()]).await?;
        let approver_balance = read_amount(session, "BalanceOf", &[approver_account.0.clone()]).await?;
        info!("Final admin balance: {}", admin_balance);
        info!("Final '{}' balance: {}", approver.name, approver_balance);

        self.report.final_admin_balance = admin_balance;
        self.report.final_approver_balance = approver_balance;
        self.advance(WorkflowState::Settled);
        Ok(())
    }

    /// Read-only look at the ledger as `name`. Never submits.
    pub async fn inspect(&mut self, name: &str) -> Result<AccountSnapshot> {
        let identity = self.enrollment.wallet().get(name)?;
        let snapshot = self.snapshot_as(&identity).await;
        self.sessions.disconnect().await;
        snapshot
    }

    async fn snapshot_as(&mut self, identity: &Identity) -> Result<AccountSnapshot> {
        let session = self.sessions.switch_to(identity).await?;
        let mut snapshot = AccountSnapshot {
            identity: identity.name.clone(),
            ..AccountSnapshot::default()
        };

        snapshot.token_name = classifier::read_token_name(session.evaluate("TokenName", &[]).await)?;
        if snapshot.token_name.is_none() {
            return Ok(snapshot);
        }
        snapshot.total_supply = Some(read_amount(session, "TotalSupply", &[]).await?);
        snapshot.account_id = Some(read_own_account(session).await?);
        snapshot.balance = match classifier::optional_read(session.evaluate("ClientAccountBalance", &[]).await)? {
            Some(raw) => Some(parse_amount("ClientAccountBalance", &raw)?),
            None => None,
        };
        Ok(snapshot)
    }
}

async fn read_amount(session: &Session, transaction: &str, args: &[String]) -> Result<u64> {
    let raw = session.evaluate(transaction, args).await?;
    parse_amount(transaction, &raw)
}

async fn read_own_account(session: &Session) -> Result<AccountId> {
    let raw = session.evaluate("ClientAccountID", &[]).await?;
    let id = String::from_utf8_lossy(&raw).trim().to_string();
    if id.is_empty() {
        return Err(WorkflowError::EmptyAccountId(session.identity().name.clone()).into());
    }
    Ok(AccountId(id))
}

pub(crate) fn parse_amount(transaction: &str, raw: &[u8]) -> Result<u64> {
    let text = String::from_utf8_lossy(raw);
    text.trim().parse::<u64>().map_err(|_| {
        anyhow::Error::new(WorkflowError::InvalidAmount {
            transaction: transaction.to_string(),
            raw: text.to_string(),
        })
    })
}

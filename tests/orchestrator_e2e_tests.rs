use ::loyalty_orchestrator::classifier::{classify, ErrorKind};
use ::loyalty_orchestrator::config::{BackendType, BaseConfig};
use ::loyalty_orchestrator::orchestrator::{LedgerOrchestrator, WorkflowState};
use ::loyalty_orchestrator::traits::CredentialStore;
use anyhow::Result;

// ===== Test Helper Functions =====

fn mock_config() -> BaseConfig {
    BaseConfig {
        backend: BackendType::Mock,
        ..BaseConfig::default()
    }
}

// ===== End-to-end on the mock backend =====

#[tokio::test]
async fn test_mock_backend_runs_full_workflow() -> Result<()> {
    let mut orchestrator = LedgerOrchestrator::initialize(&mock_config())?;

    let report = orchestrator.run().await?;

    assert_eq!(orchestrator.state(), WorkflowState::Settled);
    assert_eq!(report.total_supply_after_mint, 1000);
    assert_eq!(report.final_admin_balance, 200);
    assert_eq!(report.final_approver_balance, 300);
    let sum: u64 = report.final_admin_balance
        + report.final_approver_balance
        + report.distributions[1].counterparty_balance;
    assert_eq!(sum, report.total_supply_after_mint);
    assert!(!orchestrator.sessions.is_connected());
    Ok(())
}

#[tokio::test]
async fn test_custom_amounts_and_counterparties() -> Result<()> {
    let config = BaseConfig {
        mint_amount: 90,
        transfer_amount: 30,
        allowance_amount: 10,
        counterparties: vec!["alice".to_string(), "bob".to_string(), "carol".to_string()],
        ..mock_config()
    };
    let mut orchestrator = LedgerOrchestrator::initialize(&config)?;

    let report = orchestrator.run().await?;

    assert_eq!(report.distributions.len(), 3);
    assert_eq!(report.distributions[2].admin_balance, 0);
    assert_eq!(report.approver.as_deref(), Some("alice"));
    assert_eq!(report.final_approver_balance, 20);
    assert_eq!(report.final_admin_balance, 10);
    assert_eq!(orchestrator.history().last(), Some(&WorkflowState::Settled));
    assert!(orchestrator.history().contains(&WorkflowState::Distributed(3)));
    Ok(())
}

#[tokio::test]
async fn test_insufficient_mint_aborts_at_distribution() -> Result<()> {
    let config = BaseConfig {
        mint_amount: 600,
        ..mock_config()
    };
    let mut orchestrator = LedgerOrchestrator::initialize(&config)?;

    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(classify(&err), ErrorKind::EndorsementFailure);
    assert_eq!(orchestrator.state(), WorkflowState::Distributed(1));
    assert_eq!(orchestrator.report().distributions.len(), 1);
    assert!(!orchestrator.sessions.is_connected());
    Ok(())
}

#[tokio::test]
async fn test_enrolled_identities_land_in_wallet() -> Result<()> {
    let mut orchestrator = LedgerOrchestrator::initialize(&mock_config())?;
    orchestrator.run().await?;

    let wallet = orchestrator.enrollment.wallet();
    for name in ["admin", "customer1", "customer2"] {
        assert!(wallet.exists(name)?, "{} missing", name);
    }

    let snapshot = orchestrator.inspect("customer1").await?;
    assert_eq!(snapshot.balance, Some(300));
    Ok(())
}

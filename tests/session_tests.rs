use ::loyalty_orchestrator::config::OrchestratorContext;
use ::loyalty_orchestrator::error::SessionError;
use ::loyalty_orchestrator::gateway::{GatewayVariant, MockLedger};
use ::loyalty_orchestrator::session::SessionManager;
use ::loyalty_orchestrator::types::{EnrollmentMaterial, Identity};
use anyhow::Result;

// ===== Test Helper Functions =====

fn identity(name: &str) -> Identity {
    Identity::x509(
        name,
        "Org1MSP",
        EnrollmentMaterial {
            certificate: format!("cert-{name}").into_bytes(),
            key: format!("key-{name}").into_bytes(),
        },
    )
}

fn manager(ledger: &MockLedger) -> SessionManager {
    SessionManager::new(GatewayVariant::Mock(ledger.clone()), &OrchestratorContext::default())
}

// ===== Tests =====

#[tokio::test]
async fn test_connect_binds_identity_and_channel() -> Result<()> {
    let ledger = MockLedger::new("Org1MSP");
    let mut sessions = manager(&ledger);

    let session = sessions.connect_as(&identity("admin")).await?;

    assert_eq!(session.identity().name, "admin");
    assert_eq!(session.connection().channel, "loyaltychannel");
    assert_eq!(session.connection().contract, "loyaltypoints");
    assert_eq!(sessions.active_identity(), Some("admin"));
    Ok(())
}

#[tokio::test]
async fn test_second_connect_is_rejected() -> Result<()> {
    let ledger = MockLedger::new("Org1MSP");
    let mut sessions = manager(&ledger);
    sessions.connect_as(&identity("admin")).await?;

    let err = sessions.connect_as(&identity("customer1")).await.err().expect("rejected");

    match err.downcast_ref::<SessionError>() {
        Some(SessionError::AlreadyConnected { active, requested }) => {
            assert_eq!(active, "admin");
            assert_eq!(requested, "customer1");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(ledger.connects(), 1);
    assert_eq!(sessions.active_identity(), Some("admin"));
    Ok(())
}

#[tokio::test]
async fn test_switch_releases_previous_session() -> Result<()> {
    let ledger = MockLedger::new("Org1MSP");
    let mut sessions = manager(&ledger);
    sessions.connect_as(&identity("admin")).await?;

    let session = sessions.switch_to(&identity("customer1")).await?;
    assert_eq!(session.identity().name, "customer1");

    assert_eq!(ledger.open_connections(), 1);
    assert_eq!(ledger.connects(), 2);
    Ok(())
}

#[tokio::test]
async fn test_disconnect_is_idempotent() -> Result<()> {
    let ledger = MockLedger::new("Org1MSP");
    let mut sessions = manager(&ledger);
    sessions.connect_as(&identity("admin")).await?;

    sessions.disconnect().await;
    sessions.disconnect().await;

    assert!(!sessions.is_connected());
    assert_eq!(ledger.open_connections(), 0);
    assert!(matches!(
        sessions.current().err().and_then(|e| e.downcast::<SessionError>().ok()),
        Some(SessionError::NotConnected)
    ));
    Ok(())
}

#[tokio::test]
async fn test_failed_connect_leaves_no_session() -> Result<()> {
    let ledger = MockLedger::new("Org1MSP");
    ledger.set_offline(true);
    let mut sessions = manager(&ledger);

    assert!(sessions.connect_as(&identity("admin")).await.is_err());
    assert!(!sessions.is_connected());

    ledger.set_offline(false);
    sessions.connect_as(&identity("admin")).await?;
    assert!(sessions.is_connected());
    Ok(())
}

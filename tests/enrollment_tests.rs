use ::loyalty_orchestrator::ca::{CertificateAuthorityVariant, MockCertificateAuthority};
use ::loyalty_orchestrator::classifier::{classify, ErrorKind};
use ::loyalty_orchestrator::config::OrchestratorContext;
use ::loyalty_orchestrator::enrollment::{EnrollmentOutcome, EnrollmentService};
use ::loyalty_orchestrator::error::{CaError, EnrollmentFailure};
use ::loyalty_orchestrator::traits::CredentialStore;
use ::loyalty_orchestrator::wallet::{MemoryWallet, RocksWallet, WalletVariant};
use anyhow::Result;

// ===== Test Helper Functions =====

fn service(wallet: &MemoryWallet, ca: &MockCertificateAuthority, context: &OrchestratorContext) -> EnrollmentService {
    EnrollmentService::new(
        WalletVariant::Memory(wallet.clone()),
        CertificateAuthorityVariant::Mock(ca.clone()),
        context.clone(),
    )
}

fn setup() -> (MemoryWallet, MockCertificateAuthority, OrchestratorContext) {
    let context = OrchestratorContext::default();
    let ca = MockCertificateAuthority::new(&context.admin_id, &context.admin_secret);
    (MemoryWallet::new(), ca, context)
}

// ===== Admin =====

#[tokio::test]
async fn test_enroll_admin_is_idempotent() -> Result<()> {
    let (wallet, ca, context) = setup();
    let enrollment = service(&wallet, &ca, &context);

    let first = enrollment.enroll_admin().await?;
    assert!(matches!(first, EnrollmentOutcome::Enrolled(_)));
    assert_eq!(ca.enroll_calls(), 1);

    let second = enrollment.enroll_admin().await?;
    assert!(matches!(second, EnrollmentOutcome::AlreadyPresent(_)));
    assert_eq!(ca.enroll_calls(), 1);
    assert_eq!(first.identity(), second.identity());
    Ok(())
}

#[tokio::test]
async fn test_enroll_admin_wrong_secret_is_fatal() -> Result<()> {
    let (wallet, ca, mut context) = setup();
    context.admin_secret = "wrong".to_string();
    let enrollment = service(&wallet, &ca, &context);

    let err = enrollment.enroll_admin().await.unwrap_err();

    assert_eq!(classify(&err), ErrorKind::Unclassified);
    let failure = err.downcast_ref::<EnrollmentFailure>().expect("enrollment failure");
    assert_eq!(failure.identity, "admin");
    assert!(matches!(failure.source, CaError::Rejected { code: 20, .. }));
    assert!(wallet.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_authority_is_connection_failure() -> Result<()> {
    let (wallet, ca, context) = setup();
    ca.set_unreachable(true);

    let err = service(&wallet, &ca, &context).enroll_admin().await.unwrap_err();
    assert_eq!(classify(&err), ErrorKind::ConnectionFailure);
    Ok(())
}

#[tokio::test]
async fn test_admin_persists_across_service_restarts() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().to_str().unwrap().to_string();
    let (_, ca, context) = setup();

    {
        let wallet = RocksWallet::open(&path)?;
        let enrollment = EnrollmentService::new(
            WalletVariant::Rocks(wallet),
            CertificateAuthorityVariant::Mock(ca.clone()),
            context.clone(),
        );
        enrollment.enroll_admin().await?;
    }

    let enrollment = EnrollmentService::new(
        WalletVariant::Rocks(RocksWallet::open(&path)?),
        CertificateAuthorityVariant::Mock(ca.clone()),
        context,
    );
    let outcome = enrollment.enroll_admin().await?;
    assert!(matches!(outcome, EnrollmentOutcome::AlreadyPresent(_)));
    assert_eq!(ca.enroll_calls(), 1);
    Ok(())
}

// ===== Counterparties =====

#[tokio::test]
async fn test_register_and_enroll_new_counterparty() -> Result<()> {
    let (wallet, ca, context) = setup();
    let enrollment = service(&wallet, &ca, &context);
    let admin = enrollment.enroll_admin().await?.into_identity().expect("admin");

    let outcome = enrollment.register_and_enroll("customer1", &admin).await?;

    let identity = outcome.identity().expect("identity").clone();
    assert!(matches!(outcome, EnrollmentOutcome::Enrolled(_)));
    assert_eq!(identity.msp_id, "Org1MSP");
    assert!(ca.is_registered("customer1"));
    assert_eq!(wallet.get("customer1")?, identity);
    Ok(())
}

#[tokio::test]
async fn test_existing_counterparty_skips_authority() -> Result<()> {
    let (wallet, ca, context) = setup();
    let enrollment = service(&wallet, &ca, &context);
    let admin = enrollment.enroll_admin().await?.into_identity().expect("admin");
    enrollment.register_and_enroll("customer1", &admin).await?;
    let (enrolls, registrations) = (ca.enroll_calls(), ca.register_calls());

    let outcome = enrollment.register_and_enroll("customer1", &admin).await?;

    assert!(matches!(outcome, EnrollmentOutcome::AlreadyPresent(_)));
    assert_eq!(ca.enroll_calls(), enrolls);
    assert_eq!(ca.register_calls(), registrations);
    Ok(())
}

#[tokio::test]
async fn test_registered_elsewhere_without_secret_is_skipped() -> Result<()> {
    let (wallet, ca, context) = setup();
    ca.preregister("customer1", "unknown");
    let enrollment = service(&wallet, &ca, &context);
    let admin = enrollment.enroll_admin().await?.into_identity().expect("admin");

    let outcome = enrollment.register_and_enroll("customer1", &admin).await?;

    assert_eq!(outcome, EnrollmentOutcome::RegisteredRemotely);
    assert!(!wallet.exists("customer1")?);
    Ok(())
}

#[tokio::test]
async fn test_registered_elsewhere_with_secret_enrolls() -> Result<()> {
    let (wallet, ca, mut context) = setup();
    context.counterparty_secret = Some("customerpw".to_string());
    ca.preregister("customer1", "customerpw");
    let enrollment = service(&wallet, &ca, &context);
    let admin = enrollment.enroll_admin().await?.into_identity().expect("admin");

    let outcome = enrollment.register_and_enroll("customer1", &admin).await?;

    assert!(matches!(outcome, EnrollmentOutcome::Enrolled(_)));
    assert!(wallet.exists("customer1")?);
    Ok(())
}

#[tokio::test]
async fn test_unenrolled_registrar_is_rejected() -> Result<()> {
    let (wallet, ca, context) = setup();
    let enrollment = service(&wallet, &ca, &context);
    let stranger = {
        let other = MemoryWallet::new();
        let other_ca = MockCertificateAuthority::new("admin", "adminpw");
        service(&other, &other_ca, &context)
            .enroll_admin()
            .await?
            .into_identity()
            .expect("admin")
    };

    let err = enrollment.register_and_enroll("customer1", &stranger).await.unwrap_err();

    assert!(!classify(&err).is_benign());
    assert!(!wallet.exists("customer1")?);
    Ok(())
}

//! Idempotent enrollment of the admin registrar and of counterparties.

use anyhow::Result;
use tracing::{info, warn};

use crate::ca::CertificateAuthorityVariant;
use crate::classifier::{classify, ErrorKind};
use crate::config::OrchestratorContext;
use crate::error::{CaError, EnrollmentFailure};
use crate::traits::{CertificateAuthority, CredentialStore};
use crate::types::{Identity, RegistrationRequest};
use crate::wallet::WalletVariant;

/// Result of an enrollment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    /// Newly enrolled and stored.
    Enrolled(Identity),
    /// The wallet already held the identity; nothing was sent to the authority.
    AlreadyPresent(Identity),
    /// The authority already knows the ID and no secret is available to
    /// enroll it, so no local credential exists.
    RegisteredRemotely,
}

impl EnrollmentOutcome {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            EnrollmentOutcome::Enrolled(identity) | EnrollmentOutcome::AlreadyPresent(identity) => {
                Some(identity)
            }
            EnrollmentOutcome::RegisteredRemotely => None,
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            EnrollmentOutcome::Enrolled(identity) | EnrollmentOutcome::AlreadyPresent(identity) => {
                Some(identity)
            }
            EnrollmentOutcome::RegisteredRemotely => None,
        }
    }
}

pub struct EnrollmentService {
    wallet: WalletVariant,
    ca: CertificateAuthorityVariant,
    context: OrchestratorContext,
}

impl EnrollmentService {
    pub fn new(wallet: WalletVariant, ca: CertificateAuthorityVariant, context: OrchestratorContext) -> Self {
        Self { wallet, ca, context }
    }

    pub fn wallet(&self) -> &WalletVariant {
        &self.wallet
    }

    /// Make sure the admin registrar is in the wallet.
    pub async fn enroll_admin(&self) -> Result<EnrollmentOutcome> {
        let admin_id = self.context.admin_id.as_str();
        if let Some(identity) = self.wallet.find(admin_id)? {
            info!("Admin identity '{}' already exists in wallet", admin_id);
            return Ok(EnrollmentOutcome::AlreadyPresent(identity));
        }

        info!("Enrolling admin '{}' with {}", admin_id, self.ca.name());
        let material = self
            .ca
            .enroll(admin_id, &self.context.admin_secret)
            .await
            .map_err(|e| enrollment_failure(admin_id, e))?;

        self.store(Identity::x509(admin_id, &self.context.msp_id, material))
    }

    /// Make sure `name` is in the wallet, registering it with `registrar` if needed.
    pub async fn register_and_enroll(&self, name: &str, registrar: &Identity) -> Result<EnrollmentOutcome> {
        if let Some(identity) = self.wallet.find(name)? {
            info!("Identity '{}' already exists in wallet, skipping enrollment", name);
            return Ok(EnrollmentOutcome::AlreadyPresent(identity));
        }

        info!("Registering and enrolling '{}'", name);
        let request = RegistrationRequest {
            enrollment_id: name.to_string(),
            affiliation: self.context.affiliation.clone(),
            role: self.context.counterparty_role.clone(),
            secret: self.context.counterparty_secret.clone(),
        };

        let secret = match self.ca.register(&request, registrar).await {
            Ok(secret) => secret,
            Err(err) => {
                let err = enrollment_failure(name, err);
                if classify(&err) != ErrorKind::AlreadyRegisteredRemotely {
                    return Err(err);
                }
                match &self.context.counterparty_secret {
                    Some(secret) => {
                        info!("'{}' is already registered, enrolling with the configured secret", name);
                        secret.clone()
                    }
                    None => {
                        warn!("'{}' is already registered, skipping registration", name);
                        return Ok(EnrollmentOutcome::RegisteredRemotely);
                    }
                }
            }
        };

        let material = self
            .ca
            .enroll(name, &secret)
            .await
            .map_err(|e| enrollment_failure(name, e))?;

        self.store(Identity::x509(name, &self.context.msp_id, material))
    }

    fn store(&self, identity: Identity) -> Result<EnrollmentOutcome> {
        match self.wallet.put(&identity.name, &identity) {
            Ok(()) => {
                info!("'{}' enrolled and added to wallet", identity.name);
                Ok(EnrollmentOutcome::Enrolled(identity))
            }
            Err(err) if classify(&err) == ErrorKind::IdentityAlreadyLocal => {
                let existing = self.wallet.get(&identity.name)?;
                Ok(EnrollmentOutcome::AlreadyPresent(existing))
            }
            Err(err) => Err(err),
        }
    }
}

fn enrollment_failure(identity: &str, err: anyhow::Error) -> anyhow::Error {
    match err.downcast::<CaError>() {
        Ok(source) => EnrollmentFailure {
            identity: identity.to_string(),
            source,
        }
        .into(),
        Err(other) => other.context(format!("enrollment failed for '{}'", identity)),
    }
}

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{EnrollmentMaterial, Identity, RegistrationRequest};

/// Certificate-issuing authority (e.g. a Fabric CA server).
///
/// Failures are raised as `CaError` so that a duplicate registration can be
/// told apart from everything else.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Authority name for logging.
    fn name(&self) -> &'static str;

    /// Exchange an enrollment ID and secret for a certificate and key.
    async fn enroll(&self, enrollment_id: &str, secret: &str) -> Result<EnrollmentMaterial>;

    /// Pre-authorize a new enrollment ID, acting as `registrar`.
    ///
    /// Returns the one-time enrollment secret.
    async fn register(&self, request: &RegistrationRequest, registrar: &Identity) -> Result<String>;
}

use anyhow::Result;
use async_trait::async_trait;

use super::{http::HttpCertificateAuthority, mock::MockCertificateAuthority};
use crate::traits::CertificateAuthority;
use crate::types::{EnrollmentMaterial, Identity, RegistrationRequest};

/// Enum representing all certificate authority implementations.
pub enum CertificateAuthorityVariant {
    Http(HttpCertificateAuthority),
    Mock(MockCertificateAuthority),
}

#[async_trait]
impl CertificateAuthority for CertificateAuthorityVariant {
    fn name(&self) -> &'static str {
        match self {
            CertificateAuthorityVariant::Http(inner) => inner.name(),
            CertificateAuthorityVariant::Mock(inner) => inner.name(),
        }
    }

    async fn enroll(&self, enrollment_id: &str, secret: &str) -> Result<EnrollmentMaterial> {
        match self {
            CertificateAuthorityVariant::Http(inner) => inner.enroll(enrollment_id, secret).await,
            CertificateAuthorityVariant::Mock(inner) => inner.enroll(enrollment_id, secret).await,
        }
    }

    async fn register(&self, request: &RegistrationRequest, registrar: &Identity) -> Result<String> {
        match self {
            CertificateAuthorityVariant::Http(inner) => inner.register(request, registrar).await,
            CertificateAuthorityVariant::Mock(inner) => inner.register(request, registrar).await,
        }
    }
}

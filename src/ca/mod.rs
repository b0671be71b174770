pub mod http;
pub mod mock;
pub mod variant;

pub use http::HttpCertificateAuthority;
pub use mock::MockCertificateAuthority;
pub use variant::CertificateAuthorityVariant;

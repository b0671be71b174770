use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hyper::header::{HeaderName, AUTHORIZATION};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CaError;
use crate::traits::CertificateAuthority;
use crate::transport::JsonClient;
use crate::types::{EnrollmentMaterial, Identity, RegistrationRequest};

/// Authority error code for an enrollment ID that is already registered.
pub const CODE_ALREADY_REGISTERED: i64 = 74;

const ENROLL_PATH: &str = "/api/v1/enroll";
const REGISTER_PATH: &str = "/api/v1/register";

/// Fabric CA REST client.
///
/// # Protocol
/// - POST /api/v1/enroll - basic auth `id:secret`, body
///   `{certificate_request, caname}` carrying a PEM CSR for a locally
///   generated P-256 key; returns `{Cert}` (base64 PEM). The key never
///   leaves this process.
/// - POST /api/v1/register - `Authorization: b64(cert).b64(sig)`, where `sig`
///   is the registrar's ECDSA-SHA256 signature over
///   `POST.b64(uri).b64(body).b64(cert)`; returns `{secret}`
///
/// Every reply is wrapped in `{success, result, errors: [{code, message}]}`.
pub struct HttpCertificateAuthority {
    client: JsonClient,
    ca_name: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CaMessage>,
}

#[derive(Debug, Deserialize)]
struct CaMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct EnrollBody<'a> {
    certificate_request: &'a str,
    caname: &'a str,
}

#[derive(Debug, Deserialize)]
struct EnrollResult {
    #[serde(rename = "Cert")]
    cert: String,
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    role: &'a str,
    affiliation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
    caname: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterResult {
    secret: String,
}

impl HttpCertificateAuthority {
    /// `tls_roots` are PEM certificates to trust for an `https` URL; empty
    /// means the bundled web PKI roots.
    pub fn new(url: String, ca_name: String, timeout: Duration, tls_roots: &[String]) -> Result<Self> {
        Ok(Self {
            client: JsonClient::with_root_certificates(url, timeout, tls_roots)?,
            ca_name,
        })
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        headers: &[(HeaderName, String)],
        payload: Vec<u8>,
    ) -> Result<T, CaError> {
        let reply = self
            .client
            .post_bytes(path, headers, payload)
            .await
            .map_err(|e| CaError::Unreachable(e.0))?;

        let envelope: Envelope<T> = serde_json::from_slice(&reply.body).map_err(|e| {
            CaError::InvalidResponse(format!("status {}: {}", reply.status, e))
        })?;

        if envelope.success {
            return envelope
                .result
                .ok_or_else(|| CaError::InvalidResponse("missing result".to_string()));
        }

        match envelope.errors.into_iter().next() {
            Some(err) => Err(CaError::Rejected {
                code: err.code,
                message: err.message,
            }),
            None => Err(CaError::Rejected {
                code: i64::from(reply.status.as_u16()),
                message: "request failed without detail".to_string(),
            }),
        }
    }
}

/// Fresh P-256 key and a PEM CSR for `common_name`. Returns `(key_pem, csr_pem)`.
fn certificate_request(common_name: &str) -> Result<(String, String)> {
    let key_pair = KeyPair::generate().context("generating enrollment key")?;
    let mut params = CertificateParams::new(Vec::<String>::new()).context("building CSR")?;
    let mut subject = DistinguishedName::new();
    subject.push(DnType::CommonName, common_name);
    params.distinguished_name = subject;

    let csr = params
        .serialize_request(&key_pair)
        .context("signing CSR")?
        .pem()
        .context("encoding CSR")?;
    Ok((key_pair.serialize_pem(), csr))
}

/// Fabric CA authorization token for a request made as `registrar`.
fn authorization_token(registrar: &Identity, method: &str, uri: &str, body: &[u8]) -> Result<String> {
    let key_pem = std::str::from_utf8(&registrar.private_key)
        .with_context(|| format!("private key of '{}' is not PEM", registrar.name))?;
    let signing_key = SigningKey::from_pkcs8_pem(key_pem)
        .map_err(|e| anyhow::anyhow!("private key of '{}' is unusable: {}", registrar.name, e))?;

    let b64_cert = STANDARD.encode(&registrar.certificate);
    let payload = format!(
        "{}.{}.{}.{}",
        method,
        STANDARD.encode(uri),
        STANDARD.encode(body),
        b64_cert
    );
    let signature: Signature = signing_key.sign(payload.as_bytes());
    // The CA only accepts low-S signatures.
    let signature = signature.normalize_s().unwrap_or(signature);

    Ok(format!("{}.{}", b64_cert, STANDARD.encode(signature.to_der().as_bytes())))
}

#[async_trait]
impl CertificateAuthority for HttpCertificateAuthority {
    fn name(&self) -> &'static str {
        "http-ca"
    }

    async fn enroll(&self, enrollment_id: &str, secret: &str) -> Result<EnrollmentMaterial> {
        let (key_pem, csr_pem) = certificate_request(enrollment_id)?;

        let basic = STANDARD.encode(format!("{}:{}", enrollment_id, secret));
        let headers = [(AUTHORIZATION, format!("Basic {}", basic))];
        let payload = serde_json::to_vec(&EnrollBody {
            certificate_request: &csr_pem,
            caname: &self.ca_name,
        })?;

        let result: EnrollResult = self.call(ENROLL_PATH, &headers, payload).await?;
        let certificate = STANDARD
            .decode(&result.cert)
            .map_err(|e| CaError::InvalidResponse(format!("Cert is not base64: {}", e)))?;
        tracing::debug!("Enrolled '{}' at {}", enrollment_id, self.client.base_url());

        Ok(EnrollmentMaterial {
            certificate,
            key: key_pem.into_bytes(),
        })
    }

    async fn register(&self, request: &RegistrationRequest, registrar: &Identity) -> Result<String> {
        let payload = serde_json::to_vec(&RegisterBody {
            id: &request.enrollment_id,
            role: &request.role,
            affiliation: &request.affiliation,
            secret: request.secret.as_deref(),
            caname: &self.ca_name,
        })?;
        let token = authorization_token(registrar, "POST", REGISTER_PATH, &payload)?;
        let headers = [(AUTHORIZATION, token)];

        match self.call::<RegisterResult>(REGISTER_PATH, &headers, payload).await {
            Ok(result) => Ok(result.secret),
            Err(CaError::Rejected { code, .. }) if code == CODE_ALREADY_REGISTERED => {
                Err(CaError::AlreadyRegistered(request.enrollment_id.clone()).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

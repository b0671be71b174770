use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::CaError;
use crate::traits::CertificateAuthority;
use crate::types::{EnrollmentMaterial, Identity, RegistrationRequest};

#[derive(Default)]
struct MockCaState {
    /// enrollment id -> secret
    registered: HashMap<String, String>,
    /// Subjects of issued certificates.
    enrolled: HashSet<String>,
    enroll_calls: usize,
    register_calls: usize,
    unreachable: bool,
}

/// In-memory certificate authority for testing.
///
/// Issues deterministic PEM-shaped material and records call counts.
#[derive(Clone)]
pub struct MockCertificateAuthority {
    state: Arc<Mutex<MockCaState>>,
}

impl MockCertificateAuthority {
    /// Authority with one bootstrap registrar.
    pub fn new(admin_id: &str, admin_secret: &str) -> Self {
        let ca = Self {
            state: Arc::new(Mutex::new(MockCaState::default())),
        };
        ca.preregister(admin_id, admin_secret);
        ca
    }

    /// Register an ID out of band, as if another client had done it.
    pub fn preregister(&self, enrollment_id: &str, secret: &str) {
        self.state
            .lock()
            .unwrap()
            .registered
            .insert(enrollment_id.to_string(), secret.to_string());
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub fn enroll_calls(&self) -> usize {
        self.state.lock().unwrap().enroll_calls
    }

    pub fn register_calls(&self) -> usize {
        self.state.lock().unwrap().register_calls
    }

    pub fn is_registered(&self, enrollment_id: &str) -> bool {
        self.state.lock().unwrap().registered.contains_key(enrollment_id)
    }

    fn pem(label: &str, seed: &str) -> Vec<u8> {
        let digest = hex::encode(Sha256::digest(seed.as_bytes()));
        format!("-----BEGIN {label}-----\n{digest}\n-----END {label}-----\n").into_bytes()
    }
}

#[async_trait]
impl CertificateAuthority for MockCertificateAuthority {
    fn name(&self) -> &'static str {
        "mock-ca"
    }

    async fn enroll(&self, enrollment_id: &str, secret: &str) -> Result<EnrollmentMaterial> {
        let mut state = self.state.lock().unwrap();
        state.enroll_calls += 1;
        if state.unreachable {
            return Err(CaError::Unreachable("mock authority offline".to_string()).into());
        }
        match state.registered.get(enrollment_id) {
            Some(expected) if expected == secret => {}
            _ => {
                return Err(CaError::Rejected {
                    code: 20,
                    message: "Authentication failure".to_string(),
                }
                .into())
            }
        }
        state.enrolled.insert(enrollment_id.to_string());

        let serial = state.enroll_calls;
        Ok(EnrollmentMaterial {
            certificate: Self::pem("CERTIFICATE", &format!("{enrollment_id}/cert/{serial}")),
            key: Self::pem("PRIVATE KEY", &format!("{enrollment_id}/key/{serial}")),
        })
    }

    async fn register(&self, request: &RegistrationRequest, registrar: &Identity) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.register_calls += 1;
        if state.unreachable {
            return Err(CaError::Unreachable("mock authority offline".to_string()).into());
        }
        if !state.enrolled.contains(&registrar.name) {
            return Err(CaError::Rejected {
                code: 71,
                message: format!("registrar '{}' is not enrolled", registrar.name),
            }
            .into());
        }
        if state.registered.contains_key(&request.enrollment_id) {
            return Err(CaError::AlreadyRegistered(request.enrollment_id.clone()).into());
        }

        let secret = request
            .secret
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        state
            .registered
            .insert(request.enrollment_id.clone(), secret.clone());
        Ok(secret)
    }
}

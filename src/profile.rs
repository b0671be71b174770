//! Just enough of a connection profile to locate the certificate authority.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateAuthorityEntry {
    pub url: String,
    #[serde(rename = "caName")]
    pub ca_name: Option<String>,
    #[serde(rename = "tlsCACerts")]
    pub tls_ca_certs: Option<TlsCaCerts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsCaCerts {
    pub pem: PemList,
}

/// Profiles carry either one PEM string or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PemList {
    One(String),
    Many(Vec<String>),
}

impl CertificateAuthorityEntry {
    /// TLS roots to trust for this authority; empty when the profile has none.
    pub fn tls_roots(&self) -> Vec<String> {
        match self.tls_ca_certs.as_ref().map(|certs| &certs.pem) {
            Some(PemList::One(pem)) => vec![pem.clone()],
            Some(PemList::Many(pems)) => pems.clone(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionProfile {
    pub name: Option<String>,
    #[serde(rename = "certificateAuthorities", default)]
    pub certificate_authorities: HashMap<String, CertificateAuthorityEntry>,
}

impl ConnectionProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn certificate_authority(&self, name: &str) -> Result<&CertificateAuthorityEntry> {
        self.certificate_authorities
            .get(name)
            .ok_or_else(|| anyhow!("certificate authority '{}' not in connection profile", name))
    }
}

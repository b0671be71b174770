use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::token_contract::{Caller, TokenContract};
use crate::error::GatewayError;
use crate::traits::{ConnectOptions, GatewayConnection, LedgerGateway};
use crate::types::{AccountId, EndorsementDetail, Identity};

const MOCK_PEER: &str = "peer0.mock.example.com";

struct MockLedgerState {
    contract: TokenContract,
    /// connection id -> caller
    connections: HashMap<String, Caller>,
    /// Committed transactions as (identity, function).
    committed: Vec<(String, String)>,
    connects: usize,
    offline: bool,
    /// Function name whose next submission is refused by peers.
    reject_next: Option<String>,
}

/// In-memory ledger hosting one token contract.
///
/// Submissions apply atomically; evaluations run against a throwaway copy of
/// the state so they can never change it.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<MockLedgerState>>,
}

impl MockLedger {
    pub fn new(minter_msp: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockLedgerState {
                contract: TokenContract::new(minter_msp),
                connections: HashMap::new(),
                committed: Vec::new(),
                connects: 0,
                offline: false,
                reject_next: None,
            })),
        }
    }

    /// Account id the contract derives for `identity`.
    pub fn account_for(identity: &Identity) -> AccountId {
        AccountId(format!(
            "x509::/OU=client/CN={}::/CN=ca.{}",
            identity.name,
            identity.msp_id.to_lowercase()
        ))
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Make peers refuse the next submission of `function`.
    pub fn reject_next_submit(&self, function: &str) {
        self.state.lock().unwrap().reject_next = Some(function.to_string());
    }

    pub fn contract(&self) -> TokenContract {
        self.state.lock().unwrap().contract.clone()
    }

    pub fn committed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().committed.clone()
    }

    /// Number of committed submissions of `function`.
    pub fn committed_count(&self, function: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .committed
            .iter()
            .filter(|(_, f)| f == function)
            .count()
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().unwrap().connections.len()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    fn caller_for(state: &MockLedgerState, connection: &GatewayConnection) -> Result<Caller> {
        if state.offline {
            return Err(GatewayError::Connection("mock ledger offline".to_string()).into());
        }
        state.connections.get(&connection.id).cloned().ok_or_else(|| {
            GatewayError::Connection(format!("connection {} is closed", connection.id)).into()
        })
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    fn name(&self) -> &'static str {
        "mock-ledger"
    }

    async fn connect(&self, identity: &Identity, options: &ConnectOptions) -> Result<GatewayConnection> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(GatewayError::Connection("mock ledger offline".to_string()).into());
        }
        if identity.certificate.is_empty() {
            return Err(GatewayError::Connection(format!(
                "identity '{}' has no certificate",
                identity.name
            ))
            .into());
        }

        let connection = GatewayConnection {
            id: uuid::Uuid::new_v4().to_string(),
            identity: identity.name.clone(),
            channel: options.channel.clone(),
            contract: options.contract.clone(),
        };
        state.connections.insert(
            connection.id.clone(),
            Caller {
                account: Self::account_for(identity),
                msp_id: identity.msp_id.clone(),
            },
        );
        state.connects += 1;
        Ok(connection)
    }

    async fn submit(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        let caller = Self::caller_for(&state, connection)?;

        let refused = state.reject_next.as_deref() == Some(transaction);
        let outcome = if refused {
            state.reject_next = None;
            Err("endorsement policy failure injected by mock".to_string())
        } else {
            state.contract.execute(&caller, transaction, args)
        };

        match outcome {
            Ok(payload) => {
                state
                    .committed
                    .push((connection.identity.clone(), transaction.to_string()));
                Ok(payload)
            }
            Err(message) => Err(GatewayError::Endorsement {
                transaction: transaction.to_string(),
                message: "no valid endorsements".to_string(),
                endorsements: vec![EndorsementDetail {
                    peer: MOCK_PEER.to_string(),
                    status: 500,
                    message,
                }],
            }
            .into()),
        }
    }

    async fn evaluate(
        &self,
        connection: &GatewayConnection,
        transaction: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let caller = Self::caller_for(&state, connection)?;
        let mut scratch = state.contract.clone();
        scratch
            .execute(&caller, transaction, args)
            .map_err(|message| {
                GatewayError::Evaluation {
                    transaction: transaction.to_string(),
                    message,
                }
                .into()
            })
    }

    async fn disconnect(&self, connection: &GatewayConnection) -> Result<()> {
        self.state.lock().unwrap().connections.remove(&connection.id);
        Ok(())
    }
}

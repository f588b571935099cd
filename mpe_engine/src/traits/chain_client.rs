use std::fmt::Display;

use thiserror::Error;

use crate::db_types::ReceivedTransaction;

/// The error code zcashd-family nodes return for an invalid address or viewing key.
pub const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainClientError {
    #[error("Node returned RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Could not communicate with the node. {0}")]
    Transport(String),
    #[error("The node sent a response that could not be understood. {0}")]
    InvalidResponse(String),
}

impl ChainClientError {
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            ChainClientError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_invalid_address_or_key(&self) -> bool {
        self.rpc_code() == Some(RPC_INVALID_ADDRESS_OR_KEY)
    }
}

/// Whether the node should rescan the chain for transactions after a viewing key import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RescanPolicy {
    Yes,
    No,
    #[default]
    WhenKeyIsNew,
}

impl Display for RescanPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RescanPolicy::Yes => f.write_str("yes"),
            RescanPolicy::No => f.write_str("no"),
            RescanPolicy::WhenKeyIsNew => f.write_str("whenkeyisnew"),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Lists the transactions received at `address` that have at least `min_confirmations` confirmations.
    async fn received_by_address(
        &self,
        address: &str,
        min_confirmations: u32,
    ) -> Result<Vec<ReceivedTransaction>, ChainClientError>;

    /// Imports a viewing key so the node can see incoming transactions for the addresses it controls.
    async fn import_viewing_key(
        &self,
        viewing_key: &str,
        rescan: RescanPolicy,
        start_height: Option<u64>,
    ) -> Result<(), ChainClientError>;
}

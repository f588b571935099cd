//! A [`ChainClient`] for zcashd-compatible nodes (zcashd, ycashd), spoken over JSON-RPC 1.0 with HTTP basic auth.
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use log::*;
use mpe_common::Secret;
use mpe_engine::{db_types::ReceivedTransaction, ChainClient, ChainClientError, RescanPolicy};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{config::ChainConfig, errors::ConfigError};

/// The first memo byte that marks a memo field as empty.
const NO_MEMO: u8 = 0xF6;
/// zcashd reports amounts in zatoshis alongside the float amount. One coin is 10^8 zatoshis.
const ZATOSHI_SCALE: u32 = 8;

#[derive(Clone)]
pub struct ZcashRpcClient {
    currency: String,
    url: String,
    user: String,
    password: Secret<String>,
    client: Arc<Client>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for ZcashRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ZcashRpcClient({} @ {})", self.currency, self.url)
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// One entry of a `z_listreceivedbyaddress` response. Fields the engine doesn't use are ignored.
#[derive(Debug, Deserialize)]
struct ReceivedNote {
    txid: String,
    amount: Decimal,
    #[serde(rename = "amountZat", default)]
    amount_zat: Option<i64>,
    #[serde(default)]
    memo: Option<String>,
    #[serde(default)]
    confirmations: i64,
}

impl ReceivedNote {
    fn into_transaction(self) -> ReceivedTransaction {
        let amount = self.amount_zat.map(|zat| Decimal::new(zat, ZATOSHI_SCALE)).unwrap_or(self.amount);
        let memo = self.memo.as_deref().and_then(|m| decode_memo(&self.txid, m));
        let confirmations = u32::try_from(self.confirmations.max(0)).unwrap_or(u32::MAX);
        ReceivedTransaction { txid: self.txid, amount, memo, confirmations }
    }
}

impl ZcashRpcClient {
    pub fn new(config: &ChainConfig) -> Result<Self, ConfigError> {
        let timeout = config.rpc_timeout.to_std().map_err(|e| ConfigError::RpcClient {
            currency: config.currency.clone(),
            reason: format!("Invalid timeout. {e}"),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::RpcClient { currency: config.currency.clone(), reason: e.to_string() })?;
        Ok(Self {
            currency: config.currency.clone(),
            url: config.rpc_url.clone(),
            user: config.rpc_user.clone(),
            password: config.rpc_password.clone(),
            client: Arc::new(client),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn currency(&self) -> &str {
        self.currency.as_str()
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainClientError> {
        let id = format!("mpe-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let request = RpcRequest { jsonrpc: "1.0", id, method, params };
        trace!("⛓️ {} RPC call: {method}", self.currency);
        let mut req = self.client.post(&self.url).json(&request);
        if !self.user.is_empty() || !self.password.is_empty() {
            req = req.basic_auth(&self.user, Some(self.password.reveal()));
        }
        let response = req.send().await.map_err(|e| ChainClientError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ChainClientError::Transport(e.to_string()))?;
        // zcashd reports RPC errors with a 500 status and a JSON body, so the body is read before the status is judged.
        match serde_json::from_str::<RpcResponse>(&body) {
            Ok(rpc) => rpc_result(rpc),
            Err(_) if !status.is_success() => {
                Err(ChainClientError::Transport(format!("{method} returned HTTP {}", status.as_u16())))
            },
            Err(e) => Err(ChainClientError::InvalidResponse(format!("{method}: {e}"))),
        }
    }
}

fn rpc_result<T: DeserializeOwned>(response: RpcResponse) -> Result<T, ChainClientError> {
    if let Some(RpcErrorBody { code, message }) = response.error {
        return Err(ChainClientError::Rpc { code, message });
    }
    serde_json::from_value(response.result).map_err(|e| ChainClientError::InvalidResponse(e.to_string()))
}

/// Decodes a hex memo field into text.
///
/// Returns `None` for the "no memo" marker, for memos with no text, and for memos that are not valid hex.
pub fn decode_memo(txid: &str, memo_hex: &str) -> Option<String> {
    let bytes = match hex::decode(memo_hex.trim()) {
        Ok(b) => b,
        Err(e) => {
            warn!("⛓️ Transaction {txid} has a memo that is not valid hex. Ignoring it. {e}");
            return None;
        },
    };
    match bytes.first() {
        None | Some(&NO_MEMO) => return None,
        _ => {},
    }
    let end = bytes.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
    let text = String::from_utf8_lossy(&bytes[..end]).into_owned();
    (!text.is_empty()).then_some(text)
}

impl ChainClient for ZcashRpcClient {
    async fn received_by_address(
        &self,
        address: &str,
        min_confirmations: u32,
    ) -> Result<Vec<ReceivedTransaction>, ChainClientError> {
        let notes: Vec<ReceivedNote> =
            self.call("z_listreceivedbyaddress", json!([address, min_confirmations])).await?;
        trace!("⛓️ {} notes received at {address}", notes.len());
        Ok(notes.into_iter().map(ReceivedNote::into_transaction).collect())
    }

    async fn import_viewing_key(
        &self,
        viewing_key: &str,
        rescan: RescanPolicy,
        start_height: Option<u64>,
    ) -> Result<(), ChainClientError> {
        let params = match start_height {
            Some(height) => json!([viewing_key, rescan.to_string(), height]),
            None => json!([viewing_key, rescan.to_string()]),
        };
        let _: Value = self.call("z_importviewingkey", params).await?;
        info!("⛓️ Viewing key imported into the {} node (rescan: {rescan})", self.currency);
        Ok(())
    }
}

//! JsonRpcClient: a [`ChainClient`] backed by an Ethereum node's HTTP JSON-RPC.
//!
//! Reads go out as `eth_call` against the configured block tag (`pending` by
//! default, so reads see the node's own queued transactions). Writes are
//! pre-flighted with `eth_estimateGas` and then submitted with
//! `eth_sendTransaction`, so the node must manage the sending account's keys.
//! Requires the `eth-call` feature.

use alloy_primitives::hex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokengate_core::{
    Address, CallRequest, ChainClient, ClientError, ClientFuture, Revert, Selector, TxContext,
    TxHash,
};
use tracing::{debug, warn};

/// Connection settings for [`JsonRpcClient`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub url: String,
    pub timeout_ms: u64,
    /// Block tag or number that reads and code lookups run against.
    pub block: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8545".to_string(),
            timeout_ms: 10_000,
            block: "pending".to_string(),
        }
    }
}

/// Client that forwards calls and transactions to a node over JSON-RPC.
#[derive(Clone)]
pub struct JsonRpcClient {
    url: String,
    block: String,
    client: reqwest::Client,
}

impl JsonRpcClient {
    pub fn new(config: RpcConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::Transport(format!("http client setup failed: {e}")))?;
        Ok(Self {
            url: config.url,
            block: config.block,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn block(&self) -> &str {
        &self.block
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url)
            .field("block", &self.block)
            .finish()
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<NodeError>,
}

/// An `error` object returned by the node.
#[derive(Debug, Clone, Deserialize)]
struct NodeError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl NodeError {
    /// Revert payload, either a bare hex string or nested one level as `{ "data": "0x.." }`.
    fn revert_data(&self) -> Option<Vec<u8>> {
        let raw = match self.data.as_ref()? {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("data")?.as_str()?,
            _ => return None,
        };
        decode_hex(raw).ok().filter(|bytes| !bytes.is_empty())
    }

    fn is_revert(&self) -> bool {
        self.code == 3 || self.message.to_ascii_lowercase().contains("revert")
    }
}

enum RpcError {
    Client(ClientError),
    Node(NodeError),
}

impl From<ClientError> for RpcError {
    fn from(e: ClientError) -> Self {
        RpcError::Client(e)
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Transport(e.to_string())
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, ClientError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| ClientError::Decode(format!("bad hex {value:?}: {e}")))
}

fn hex_result(value: &Value) -> Result<Vec<u8>, ClientError> {
    value
        .as_str()
        .ok_or_else(|| ClientError::Decode(format!("expected hex string, got {value}")))
        .and_then(decode_hex)
}

fn quantity(value: &Value) -> Result<u64, ClientError> {
    let s = value
        .as_str()
        .ok_or_else(|| ClientError::Decode(format!("expected quantity, got {value}")))?;
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16)
        .map_err(|e| ClientError::Decode(format!("bad quantity {s:?}: {e}")))
}

fn call_object(from: Option<Address>, request: &CallRequest) -> Value {
    let mut obj = json!({
        "to": request.to.to_string(),
        "data": hex::encode_prefixed(&request.data),
    });
    if let Some(from) = from {
        obj["from"] = json!(from.to_string());
    }
    obj
}

/// What deployed bytecode says about a selector the node would not explain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeVerdict {
    /// No code at the address.
    Empty,
    /// The selector is compared against, the code forwards calls with
    /// DELEGATECALL, or no dispatcher was recognised.
    MayAnswer,
    /// A selector dispatcher was found and it never compares against this one.
    Lacks,
}

/// Linear scan of `code` for the usual `PUSHn <selector> EQ` dispatcher.
///
/// Compilers drop leading zero bytes from constants, so a selector such as
/// `0x00abcdef` is pushed with PUSH3 and `0x00000000` with PUSH0. Push
/// payloads are skipped so data embedded in other pushes cannot match. Only
/// full-width `PUSH4 .. EQ` comparisons count as evidence of a dispatcher.
fn inspect_code(code: &[u8], selector: Selector) -> CodeVerdict {
    const EQ: u8 = 0x14;
    const PUSH0: u8 = 0x5f;
    const PUSH1: u8 = 0x60;
    const PUSH4: u8 = 0x63;
    const PUSH32: u8 = 0x7f;
    const DUP1: u8 = 0x80;
    const DUP16: u8 = 0x8f;
    const DELEGATECALL: u8 = 0xf4;

    if code.is_empty() {
        return CodeVerdict::Empty;
    }
    let wanted = u32::from_be_bytes(selector.0);
    let compared_at = |pc: usize| match code.get(pc) {
        Some(&EQ) => true,
        Some(op) if (DUP1..=DUP16).contains(op) => code.get(pc + 1) == Some(&EQ),
        _ => false,
    };

    let mut dispatcher = false;
    let mut pc = 0;
    while let Some(&op) = code.get(pc) {
        if op == DELEGATECALL {
            return CodeVerdict::MayAnswer;
        }
        let width = match op {
            PUSH0 => 0,
            PUSH1..=PUSH32 => usize::from(op - PUSH1) + 1,
            _ => {
                pc += 1;
                continue;
            }
        };
        let next = pc + 1 + width;
        let Some(payload) = code.get(pc + 1..next) else {
            break;
        };
        if width <= 4 {
            let value = payload.iter().fold(0u32, |acc, b| acc << 8 | u32::from(*b));
            let compared = compared_at(next);
            if op == PUSH4 && compared {
                dispatcher = true;
            }
            if value == wanted && (compared || op == PUSH4) {
                return CodeVerdict::MayAnswer;
            }
        }
        pc = next;
    }
    if dispatcher {
        CodeVerdict::Lacks
    } else {
        CodeVerdict::MayAnswer
    }
}

fn request_selector(data: &[u8]) -> Option<Selector> {
    data.get(..4).map(Selector::from_slice)
}

impl JsonRpcClient {
    /// Send a raw JSON-RPC request and return the "result" field.
    async fn json_rpc(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        debug!(method, "json-rpc request");
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let parsed: RpcResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Decode(format!("{method} response parse failed: {e}"))
            }
        })?;

        if let Some(err) = parsed.error {
            return Err(RpcError::Node(err));
        }
        parsed
            .result
            .ok_or_else(|| ClientError::Decode(format!("{method} response missing 'result'")).into())
    }

    /// Tell "the contract does not have this function" apart from "it
    /// reverted" when the node gave us nothing to go on.
    async fn classify_silent_failure(&self, request: &CallRequest, revert: Revert) -> ClientError {
        let Some(selector) = request_selector(&request.data) else {
            return ClientError::Reverted(revert);
        };
        let params = json!([request.to.to_string(), self.block]);
        let code = match self.json_rpc("eth_getCode", params).await {
            Ok(value) => match hex_result(&value) {
                Ok(code) => code,
                Err(e) => return e,
            },
            Err(RpcError::Client(e)) => return e,
            Err(RpcError::Node(e)) => {
                return ClientError::Transport(format!("eth_getCode failed ({}): {}", e.code, e.message))
            }
        };
        match inspect_code(&code, selector) {
            CodeVerdict::MayAnswer => ClientError::Reverted(revert),
            verdict => {
                debug!(to = %request.to, %selector, ?verdict, "selector not dispatched");
                ClientError::UnknownSelector(selector)
            }
        }
    }

    async fn classify_node_error(&self, request: &CallRequest, err: NodeError) -> ClientError {
        if let Some(data) = err.revert_data() {
            return ClientError::Reverted(Revert::new(data));
        }
        if err.is_revert() {
            let revert = Revert::default().with_reason(err.message);
            return self.classify_silent_failure(request, revert).await;
        }
        ClientError::Transport(format!("rpc error {}: {}", err.code, err.message))
    }

    async fn eth_call(&self, request: &CallRequest) -> Result<Vec<u8>, ClientError> {
        let params = json!([call_object(request.from, request), self.block]);
        match self.json_rpc("eth_call", params).await {
            Ok(value) => {
                let output = hex_result(&value)?;
                if output.is_empty() && !request.data.is_empty() {
                    // Both a missing function and a function without return values
                    // come back as `0x`.
                    return match self.classify_silent_failure(request, Revert::default()).await {
                        ClientError::Reverted(_) => Ok(output),
                        other => Err(other),
                    };
                }
                Ok(output)
            }
            Err(RpcError::Client(e)) => Err(e),
            Err(RpcError::Node(e)) => Err(self.classify_node_error(request, e).await),
        }
    }

    async fn submit(&self, request: &CallRequest, ctx: TxContext) -> Result<TxHash, ClientError> {
        let call = call_object(Some(ctx.from), request);
        let estimate = match self.json_rpc("eth_estimateGas", json!([call.clone()])).await {
            Ok(value) => quantity(&value)?,
            Err(RpcError::Client(e)) => return Err(e),
            Err(RpcError::Node(e)) => {
                let cause = self.classify_node_error(request, e).await;
                warn!(to = %request.to, error = %cause, "gas estimation failed");
                return Err(cause);
            }
        };

        let mut tx = call;
        tx["gas"] = json!(format!("0x{:x}", ctx.gas_limit.unwrap_or(estimate)));
        let value = match self.json_rpc("eth_sendTransaction", json!([tx])).await {
            Ok(value) => value,
            Err(RpcError::Client(e)) => return Err(e),
            Err(RpcError::Node(e)) => return Err(self.classify_node_error(request, e).await),
        };
        let bytes = hex_result(&value)?;
        if bytes.len() != 32 {
            return Err(ClientError::Decode(format!("transaction hash {value} is not 32 bytes")));
        }
        debug!(to = %request.to, gas = estimate, "transaction submitted");
        Ok(TxHash::from_slice(&bytes))
    }
}

impl ChainClient for JsonRpcClient {
    fn call(&self, request: CallRequest) -> ClientFuture<Vec<u8>> {
        let this = self.clone();
        Box::pin(async move { this.eth_call(&request).await })
    }

    fn send_transaction(&self, request: CallRequest, ctx: TxContext) -> ClientFuture<TxHash> {
        let this = self.clone();
        Box::pin(async move { this.submit(&request, ctx).await })
    }
}

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::{
    config::ExchangeConfig,
    exchange::traits::{MarketDataProvider, OrderGateway, OrderStatus},
    types::{OrderBookSnapshot, PriceLevel, Side},
};

use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct BybitCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl BybitCredentials {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BYBIT_API_KEY").ok()?;
        let api_secret = std::env::var("BYBIT_API_SECRET").ok()?;
        if api_key.is_empty() || api_secret.is_empty() {
            return None;
        }
        Some(Self {
            api_key,
            api_secret,
        })
    }
}

/// Bybit v5 REST client. Market data is public; order placement, order
/// status and balances require signed requests.
pub struct BybitClient {
    http: reqwest::Client,
    base_url: String,
    recv_window_ms: u64,
    credentials: Option<BybitCredentials>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg")]
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct OrderBookResult {
    s: String,
    a: Vec<[String; 2]>,
    b: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
struct OrderCreateResult {
    #[serde(rename = "orderId")]
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct OrderListResult {
    list: Vec<OrderEntry>,
}

#[derive(Debug, Deserialize)]
struct OrderEntry {
    #[serde(rename = "orderStatus")]
    order_status: String,
}

#[derive(Debug, Deserialize)]
struct WalletBalanceResult {
    list: Vec<WalletAccount>,
}

#[derive(Debug, Deserialize)]
struct WalletAccount {
    coin: Vec<WalletCoin>,
}

#[derive(Debug, Deserialize)]
struct WalletCoin {
    equity: String,
}

impl BybitClient {
    pub fn new(config: &ExchangeConfig, credentials: Option<BybitCredentials>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            recv_window_ms: config.recv_window_ms,
            credentials,
        })
    }

    fn signed_headers(&self, payload: &str) -> Result<Vec<(&'static str, String)>> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| anyhow!("BYBIT_API_KEY / BYBIT_API_SECRET not configured"))?;

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = sign_request(
            &credentials.api_secret,
            &timestamp,
            &credentials.api_key,
            self.recv_window_ms,
            payload,
        )?;

        Ok(vec![
            ("X-BAPI-API-KEY", credentials.api_key.clone()),
            ("X-BAPI-SIGN", signature),
            ("X-BAPI-TIMESTAMP", timestamp),
            ("X-BAPI-RECV-WINDOW", self.recv_window_ms.to_string()),
        ])
    }

    async fn signed_get<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let mut request = self.http.get(format!("{}{}?{}", self.base_url, path, query));
        for (name, value) in self.signed_headers(query)? {
            request = request.header(name, value);
        }
        let response: ApiResponse<T> = request.send().await?.json().await?;
        unwrap_response(response)
    }

    async fn signed_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let payload = body.to_string();
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .body(payload.clone());
        for (name, value) in self.signed_headers(&payload)? {
            request = request.header(name, value);
        }
        let response: ApiResponse<T> = request.send().await?.json().await?;
        unwrap_response(response)
    }
}

#[async_trait]
impl MarketDataProvider for BybitClient {
    async fn order_book(&self, symbol: &str, depth: u32) -> Result<OrderBookSnapshot> {
        let depth = depth.to_string();
        let response: ApiResponse<OrderBookResult> = self
            .http
            .get(format!("{}/v5/market/orderbook", self.base_url))
            .query(&[
                ("category", "spot"),
                ("symbol", symbol),
                ("limit", depth.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("order book request failed for {symbol}"))?
            .json()
            .await
            .with_context(|| format!("order book decode failed for {symbol}"))?;

        let result = unwrap_response(response)?;
        debug!(
            symbol = %result.s,
            asks = result.a.len(),
            bids = result.b.len(),
            "order book fetched"
        );

        Ok(OrderBookSnapshot::new(
            result.s,
            parse_levels(&result.a)?,
            parse_levels(&result.b)?,
        ))
    }

    async fn health_check(&self) -> Result<()> {
        let response: ApiResponse<serde_json::Value> = self
            .http
            .get(format!("{}/v5/market/time", self.base_url))
            .send()
            .await
            .context("Bybit is unreachable")?
            .json()
            .await
            .context("Bybit time response malformed")?;
        unwrap_response(response).map(|_| ())
    }
}

#[async_trait]
impl OrderGateway for BybitClient {
    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Result<String> {
        let body = json!({
            "category": "spot",
            "symbol": symbol,
            "side": side.to_string(),
            "orderType": "Limit",
            "qty": quantity.to_string(),
            "price": price.to_string(),
            "timeInForce": "GTC",
        });

        let result: OrderCreateResult = self.signed_post("/v5/order/create", body).await?;
        debug!(%symbol, %side, quantity, price, order_id = %result.order_id, "order placed");
        Ok(result.order_id)
    }

    async fn order_status(&self, symbol: &str, order_id: &str) -> Result<OrderStatus> {
        let query = format!("category=spot&symbol={symbol}&orderId={order_id}");
        let result: OrderListResult = self.signed_get("/v5/order/realtime", &query).await?;

        // An order absent from the realtime set has left the book.
        Ok(result
            .list
            .first()
            .map(|entry| parse_order_status(&entry.order_status))
            .unwrap_or(OrderStatus::Filled))
    }

    async fn wallet_balance(&self, coin: &str) -> Result<f64> {
        let query = format!("accountType=UNIFIED&coin={coin}");
        let result: WalletBalanceResult =
            self.signed_get("/v5/account/wallet-balance", &query).await?;

        let equity = result
            .list
            .first()
            .and_then(|account| account.coin.first())
            .map(|entry| entry.equity.as_str())
            .ok_or_else(|| anyhow!("no wallet entry for {coin}"))?;

        equity
            .parse()
            .with_context(|| format!("unparseable equity for {coin}: {equity}"))
    }
}

fn unwrap_response<T>(response: ApiResponse<T>) -> Result<T> {
    if response.ret_code != 0 {
        return Err(anyhow!(
            "Bybit API error {}: {}",
            response.ret_code,
            response.ret_msg
        ));
    }
    response
        .result
        .ok_or_else(|| anyhow!("Bybit response missing result payload"))
}

fn parse_levels(raw: &[[String; 2]]) -> Result<Vec<PriceLevel>> {
    raw.iter()
        .map(|level| {
            let price: f64 = level[0]
                .parse()
                .with_context(|| format!("invalid level price: {}", level[0]))?;
            let quantity: f64 = level[1]
                .parse()
                .with_context(|| format!("invalid level quantity: {}", level[1]))?;
            Ok(PriceLevel::new(price, quantity))
        })
        .collect()
}

fn parse_order_status(raw: &str) -> OrderStatus {
    match raw {
        "Filled" => OrderStatus::Filled,
        "PartiallyFilled" => OrderStatus::PartiallyFilled,
        "Cancelled" | "PartiallyFilledCanceled" | "Deactivated" => OrderStatus::Cancelled,
        "Rejected" => OrderStatus::Rejected,
        _ => OrderStatus::New,
    }
}

fn sign_request(
    secret: &str,
    timestamp: &str,
    api_key: &str,
    recv_window_ms: u64,
    payload: &str,
) -> Result<String> {
    let to_sign = format!("{timestamp}{api_key}{recv_window_ms}{payload}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("invalid API secret: {e}"))?;
    mac.update(to_sign.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_book_envelope_parses() {
        let raw = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "s": "ADAUSDT",
                "a": [["0.3443", "615.17"], ["0.3444", "614.76"]],
                "b": [["0.3441", "100.0"]],
                "ts": 1716863719031,
                "u": 230704
            }
        }"#;

        let response: ApiResponse<OrderBookResult> = serde_json::from_str(raw).unwrap();
        let result = unwrap_response(response).unwrap();
        assert_eq!(result.s, "ADAUSDT");

        let asks = parse_levels(&result.a).unwrap();
        assert_eq!(asks.len(), 2);
        assert_eq!(asks[0].price, 0.3443);
        assert_eq!(asks[0].quantity, 615.17);
    }

    #[test]
    fn test_error_envelope_is_rejected() {
        let raw = r#"{"retCode": 10001, "retMsg": "params error", "result": null}"#;
        let response: ApiResponse<OrderBookResult> = serde_json::from_str(raw).unwrap();
        let err = unwrap_response(response).unwrap_err();
        assert!(err.to_string().contains("10001"));
    }

    #[test]
    fn test_malformed_levels_fail_the_fetch() {
        let raw = vec![["bad".to_string(), "1.0".to_string()]];
        assert!(parse_levels(&raw).is_err());
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let first = sign_request("secret", "1700000000000", "key", 5000, "a=b").unwrap();
        let second = sign_request("secret", "1700000000000", "key", 5000, "a=b").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));

        let other = sign_request("secret", "1700000000001", "key", 5000, "a=b").unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_order_status_mapping() {
        assert_eq!(parse_order_status("Filled"), OrderStatus::Filled);
        assert_eq!(
            parse_order_status("PartiallyFilled"),
            OrderStatus::PartiallyFilled
        );
        assert_eq!(parse_order_status("Cancelled"), OrderStatus::Cancelled);
        assert_eq!(parse_order_status("New"), OrderStatus::New);
    }
}

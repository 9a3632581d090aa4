use super::http::{fetch_json, unexpected};
use crate::domain::errors::CollaboratorError;
use crate::domain::models::{AccountName, ChainRpc, RawAccount, TableRows, TableRowsQuery};
use serde::Deserialize;
use serde_json::json;

const SERVICE: &str = "chain rpc";
const SYSTEM_ACCOUNT: &str = "eosio";
const TOKEN_CONTRACT: &str = "eosio.token";
const CORE_SYMBOL: &str = "EOS";
const BYTES_PER_KIB: f64 = 1024.0;

/// Client for the chain API of an EOS node (`/v1/chain/*`).
#[derive(Clone)]
pub struct EosRpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl EosRpcClient {
    /// Creates a new `EosRpcClient` talking to the node at `rpc_url`.
    pub fn from_url(rpc_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: rpc_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/chain/{}", self.base_url, method)
    }
}

#[async_trait::async_trait]
impl ChainRpc for EosRpcClient {
    async fn get_account(&self, name: &AccountName) -> Result<RawAccount, CollaboratorError> {
        let request = self
            .http
            .post(self.endpoint("get_account"))
            .json(&json!({ "account_name": name }));
        fetch_json(SERVICE, request).await
    }

    /// Reads the liquid core-token balance. Accounts without a balance row hold zero.
    async fn get_currency_balance(&self, name: &AccountName) -> Result<f64, CollaboratorError> {
        let request = self
            .http
            .post(self.endpoint("get_currency_balance"))
            .json(&json!({ "code": TOKEN_CONTRACT, "account": name, "symbol": CORE_SYMBOL }));
        let balances: Vec<String> = fetch_json(SERVICE, request).await?;
        match balances.first() {
            Some(asset) => parse_asset_amount(asset),
            None => Ok(0.0),
        }
    }

    async fn get_ram_price(&self) -> Result<f64, CollaboratorError> {
        let query = TableRowsQuery {
            json: true,
            code: SYSTEM_ACCOUNT.to_string(),
            scope: SYSTEM_ACCOUNT.to_string(),
            table: "rammarket".to_string(),
            table_key: String::new(),
        };
        let market = self.get_table_rows(&query).await?;
        ram_price_per_kib(&market)
    }

    async fn get_table_rows(&self, query: &TableRowsQuery) -> Result<TableRows, CollaboratorError> {
        tracing::debug!("Querying table {} of {}", query.table, query.code);
        let request = self.http.post(self.endpoint("get_table_rows")).json(query);
        fetch_json(SERVICE, request).await
    }
}

#[derive(Deserialize)]
struct RamMarket {
    base: Connector,
    quote: Connector,
}

#[derive(Deserialize)]
struct Connector {
    balance: String,
}

/// Amount of an asset string such as `"12.5000 EOS"`.
fn parse_asset_amount(asset: &str) -> Result<f64, CollaboratorError> {
    asset
        .split_whitespace()
        .next()
        .and_then(|amount| amount.parse::<f64>().ok())
        .ok_or_else(|| unexpected(SERVICE, format!("malformed asset {asset:?}")))
}

/// Core-token price of one KiB of RAM, from the Bancor market in `eosio::rammarket`.
fn ram_price_per_kib(market: &TableRows) -> Result<f64, CollaboratorError> {
    let row = market
        .rows
        .first()
        .ok_or_else(|| unexpected(SERVICE, "empty rammarket table"))?;
    let market: RamMarket = serde_json::from_value(row.clone())
        .map_err(|e| unexpected(SERVICE, format!("malformed rammarket row: {e}")))?;

    let quote = parse_asset_amount(&market.quote.balance)?;
    let base = parse_asset_amount(&market.base.balance)?;
    if base == 0.0 {
        return Err(unexpected(SERVICE, "rammarket base balance is zero"));
    }
    Ok(quote / base * BYTES_PER_KIB)
}

use super::errors::{CollaboratorError, ExplorerError};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const MAX_ACCOUNT_NAME_LEN: usize = 13;

/// Name of an on-chain account, as taken from the current route.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Wraps a name without validating it. Names coming from the outside world should go
    /// through [`AccountName::parse`].
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parses a route parameter into an account name.
    ///
    /// Accepts 1 to 13 characters drawn from `a-z`, `1-5` and `.`. The 13th character only has
    /// four bits in the encoded name, which limits it to `.`, `1-5` and `a-j`.
    pub fn parse(raw: &str) -> Result<Self, ExplorerError> {
        let valid_char = |c: char| c.is_ascii_lowercase() || ('1'..='5').contains(&c) || c == '.';
        let valid_last = |c: char| ('a'..='j').contains(&c) || ('1'..='5').contains(&c) || c == '.';
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ACCOUNT_NAME_LEN
            && raw.chars().enumerate().all(|(i, c)| {
                if i == MAX_ACCOUNT_NAME_LEN - 1 {
                    valid_last(c)
                } else {
                    valid_char(c)
                }
            });
        if !valid {
            return Err(ExplorerError::InvalidAccountName(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account entity served by the account index.
///
/// Only `name` and `abi` are interpreted, every other field is carried through as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub name: AccountName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Abi>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl AccountRecord {
    pub fn named(name: AccountName) -> Self {
        Self {
            name,
            abi: None,
            metadata: Map::new(),
        }
    }
}

/// Published contract interface of an account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Abi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<ContractTableDescriptor>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One entry of `abi.tables`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractTableDescriptor {
    pub name: String,
    #[serde(default)]
    pub key_names: Vec<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ContractTableDescriptor {
    pub fn new(name: impl Into<String>, key_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            key_names,
            rest: Map::new(),
        }
    }
}

/// Account as reported by the chain node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawAccount {
    pub account_name: AccountName,
    #[serde(default)]
    pub ram_quota: i64,
    #[serde(default)]
    pub ram_usage: i64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Token held by an account. The index service owns its shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenDescriptor(pub Value);

/// Sent or received on-chain action. The index service owns its shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub Value);

/// Account record widened with everything the explorer shows about it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAccount {
    #[serde(flatten)]
    pub account: AccountRecord,
    pub raw: RawAccount,
    pub balance: f64,
    pub ram_price: f64,
    pub tokens: Vec<TokenDescriptor>,
}

impl EnrichedAccount {
    /// Tables declared by the account's ABI, or `None` when there is no ABI or the list is
    /// empty.
    pub fn contract_tables(&self) -> Option<&[ContractTableDescriptor]> {
        self.account
            .abi
            .as_ref()
            .and_then(|abi| abi.tables.as_deref())
            .filter(|tables| !tables.is_empty())
    }
}

/// Body of a `get_table_rows` call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRowsQuery {
    pub json: bool,
    pub code: String,
    pub scope: String,
    pub table: String,
    pub table_key: String,
}

impl TableRowsQuery {
    /// Row query for one of `account`'s own tables, keyed by the first declared key name.
    pub fn for_table(
        account: &AccountName,
        table: &ContractTableDescriptor,
    ) -> Result<Self, ExplorerError> {
        let table_key = table
            .key_names
            .first()
            .ok_or_else(|| ExplorerError::MissingTableKey(table.name.clone()))?;
        Ok(Self {
            json: true,
            code: account.to_string(),
            scope: account.to_string(),
            table: table.name.clone(),
            table_key: table_key.clone(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRows {
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default)]
    pub more: bool,
}

/// Table descriptor merged with the rows queried for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractTableRows {
    #[serde(flatten)]
    pub table: ContractTableDescriptor,
    #[serde(flatten)]
    pub rows: TableRows,
}

/// Internal service indexing accounts, their tokens and their actions.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AccountIndex: Send + Sync {
    async fn get_account(&self, name: &AccountName) -> Result<AccountRecord, CollaboratorError>;

    async fn get_account_tokens(
        &self,
        name: &AccountName,
    ) -> Result<Vec<TokenDescriptor>, CollaboratorError>;

    async fn get_account_actions_sent(
        &self,
        name: &AccountName,
    ) -> Result<Vec<Action>, CollaboratorError>;

    async fn get_account_actions_received(
        &self,
        name: &AccountName,
    ) -> Result<Vec<Action>, CollaboratorError>;
}

/// Blockchain node RPC.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_account(&self, name: &AccountName) -> Result<RawAccount, CollaboratorError>;

    /// Liquid balance of the account in the network's core token.
    async fn get_currency_balance(&self, name: &AccountName) -> Result<f64, CollaboratorError>;

    /// Current RAM price per KiB, in the core token.
    async fn get_ram_price(&self) -> Result<f64, CollaboratorError>;

    async fn get_table_rows(&self, query: &TableRowsQuery) -> Result<TableRows, CollaboratorError>;
}

/// Continuous quote feed for the network's core token.
#[cfg_attr(test, mockall::automock)]
pub trait PriceQuote: Send + Sync {
    fn eos_price(&self) -> BoxStream<'static, Result<f64, CollaboratorError>>;
}

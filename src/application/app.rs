use std::sync::Arc;

use super::account_view::AccountSources;
use super::header::Header;
use crate::config::ExplorerConfig;
use crate::domain::errors::ExplorerError;
use crate::domain::models::{
    AccountIndex, AccountName, Action, ChainRpc, ContractTableRows, EnrichedAccount, PriceQuote,
};
use crate::infrastructure::account_index::AccountIndexClient;
use crate::infrastructure::chain_rpc::EosRpcClient;
use crate::infrastructure::price_quote::CmcPriceClient;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;

/// Everything the explorer shows for one account, captured at `rendered_at`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccountPage {
    pub name: AccountName,
    pub account: EnrichedAccount,
    pub contract_tables: Option<Vec<ContractTableRows>>,
    pub actions_sent: Option<Vec<Action>>,
    pub actions_received: Option<Vec<Action>>,
    pub eos_price: Option<f64>,
    pub rendered_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Application {
    /// Composes the page for `name` from a freshly activated account view.
    ///
    /// Fails only when the account itself cannot be loaded. Tables, actions and price that fail
    /// are left out of the page.
    async fn account_page(&self, name: AccountName) -> Result<AccountPage, ExplorerError>;

    fn header(&self) -> &Header;
}

pub struct App<I, C, P> {
    sources: AccountSources<I, C, P>,
    header: Header,
}

impl<I, C, P> App<I, C, P> {
    pub fn new(sources: AccountSources<I, C, P>, header: Header) -> Self {
        Self { sources, header }
    }
}

impl App<AccountIndexClient, EosRpcClient, CmcPriceClient> {
    pub fn from_config(config: &ExplorerConfig) -> Self {
        let services = &config.services;
        let sources = AccountSources::builder()
            .index(Arc::new(AccountIndexClient::from_url(&services.account_index_url)))
            .chain(Arc::new(EosRpcClient::from_url(&services.chain_rpc_url)))
            .price_quote(Arc::new(CmcPriceClient::new(
                &services.price_ticker_url,
                config.price_poll_interval(),
            )))
            .build();
        Self::new(sources, Header::new(&config.branding))
    }
}

#[async_trait::async_trait]
impl<I, C, P> Application for App<I, C, P>
where
    I: AccountIndex + 'static,
    C: ChainRpc + 'static,
    P: PriceQuote + 'static,
{
    async fn account_page(&self, name: AccountName) -> Result<AccountPage, ExplorerError> {
        let view = self.sources.clone().activate();
        let mut account = view.account();
        let mut tables = view.contract_tables();
        let mut sent = view.actions_sent();
        let mut received = view.actions_received();
        let mut price = view.eos_price();

        view.navigate(name.clone());
        let account = first(&mut account, "account").await?;

        let (contract_tables, actions_sent, actions_received, eos_price) = tokio::join!(
            async {
                // Accounts without tables never reach the table stream.
                if account.contract_tables().is_none() {
                    return None;
                }
                optional(
                    &name,
                    "contract tables",
                    first(&mut tables, "contract tables").await,
                )
            },
            async { optional(&name, "actions sent", first(&mut sent, "actions sent").await) },
            async {
                optional(
                    &name,
                    "actions received",
                    first(&mut received, "actions received").await,
                )
            },
            async { optional(&name, "price", first(&mut price, "price").await) },
        );

        tracing::info!("Rendered account page for {}", name);
        Ok(AccountPage {
            name,
            account: EnrichedAccount::clone(&account),
            contract_tables,
            actions_sent,
            actions_received,
            eos_price,
            rendered_at: Utc::now(),
        })
    }

    fn header(&self) -> &Header {
        &self.header
    }
}

async fn first<T>(
    stream: &mut BoxStream<'static, Result<T, ExplorerError>>,
    what: &'static str,
) -> Result<T, ExplorerError> {
    stream
        .next()
        .await
        .unwrap_or(Err(ExplorerError::StreamClosed(what)))
}

fn optional<T>(name: &AccountName, what: &str, result: Result<T, ExplorerError>) -> Option<T> {
    result
        .map_err(|e| tracing::warn!("Leaving {} out of the page for {}: {}", what, name, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrandingConfig;
    use crate::domain::errors::CollaboratorError;
    use crate::domain::models::{
        Abi, AccountRecord, ContractTableDescriptor, MockAccountIndex, MockChainRpc,
        MockPriceQuote, RawAccount, TableRows,
    };
    use futures::stream;
    use serde_json::{json, Map};

    fn failure(service: &'static str) -> CollaboratorError {
        CollaboratorError::RequestFailed {
            service,
            message: "connection refused".into(),
        }
    }

    fn app(index: MockAccountIndex, chain: MockChainRpc) -> App<MockAccountIndex, MockChainRpc, MockPriceQuote> {
        let mut price = MockPriceQuote::new();
        price
            .expect_eos_price()
            .returning(|| stream::iter(vec![Ok(5.25)]).boxed());
        let sources = AccountSources::builder()
            .index(Arc::new(index))
            .chain(Arc::new(chain))
            .price_quote(Arc::new(price))
            .build();
        App::new(
            sources,
            Header::new(&BrandingConfig {
                logo_url: "logo.svg".into(),
                logo_url_1: "logo-1.svg".into(),
                app_name: "Explorer".into(),
            }),
        )
    }

    fn index_mock(abi: Option<Abi>, sent_fails: bool) -> MockAccountIndex {
        let mut index = MockAccountIndex::new();
        index.expect_get_account().returning(move |name| {
            let mut record = AccountRecord::named(name.clone());
            record.abi = abi.clone();
            Ok(record)
        });
        index.expect_get_account_tokens().returning(|_| Ok(vec![]));
        index.expect_get_account_actions_sent().returning(move |_| {
            if sent_fails {
                Err(failure("account index"))
            } else {
                Ok(vec![Action(json!({ "name": "transfer" }))])
            }
        });
        index
            .expect_get_account_actions_received()
            .returning(|_| Ok(vec![Action(json!({ "name": "buyram" }))]));
        index
    }

    fn chain_mock() -> MockChainRpc {
        let mut chain = MockChainRpc::new();
        chain.expect_get_account().returning(|name| {
            Ok(RawAccount {
                account_name: name.clone(),
                ram_quota: 0,
                ram_usage: 0,
                details: Map::new(),
            })
        });
        chain.expect_get_currency_balance().returning(|_| Ok(3.0));
        chain.expect_get_ram_price().returning(|| Ok(0.05));
        chain
    }

    #[tokio::test]
    async fn page_collects_every_stream() {
        let abi = Abi {
            tables: Some(vec![ContractTableDescriptor::new("accounts", vec!["id".into()])]),
            rest: Map::new(),
        };
        let mut chain = chain_mock();
        chain.expect_get_table_rows().returning(|_| {
            Ok(TableRows {
                rows: vec![json!({ "id": 1 })],
                more: false,
            })
        });
        let app = app(index_mock(Some(abi), false), chain);

        let page = app.account_page(AccountName::new("alice")).await.unwrap();

        assert_eq!(page.name, AccountName::new("alice"));
        assert_eq!(page.account.balance, 3.0);
        assert_eq!(page.account.ram_price, 0.05);
        assert_eq!(page.contract_tables.map(|tables| tables.len()), Some(1));
        assert_eq!(page.actions_sent, Some(vec![Action(json!({ "name": "transfer" }))]));
        assert_eq!(page.actions_received, Some(vec![Action(json!({ "name": "buyram" }))]));
        assert_eq!(page.eos_price, Some(5.25));
    }

    #[tokio::test]
    async fn failed_parts_are_left_out_of_the_page() {
        let app = app(index_mock(None, true), chain_mock());

        let page = app.account_page(AccountName::new("bob")).await.unwrap();

        assert_eq!(page.contract_tables, None);
        assert_eq!(page.actions_sent, None);
        assert_eq!(page.actions_received, Some(vec![Action(json!({ "name": "buyram" }))]));
    }

    #[tokio::test]
    async fn page_fails_when_the_account_cannot_be_loaded() {
        let mut index = MockAccountIndex::new();
        index
            .expect_get_account()
            .returning(|_| Err(failure("account index")));
        index.expect_get_account_actions_sent().returning(|_| Ok(vec![]));
        index.expect_get_account_actions_received().returning(|_| Ok(vec![]));
        let app = app(index, MockChainRpc::new());

        let result = app.account_page(AccountName::new("ghost")).await;

        assert_eq!(
            result,
            Err(ExplorerError::Collaborator(failure("account index")))
        );
    }

    #[test]
    fn header_is_exposed() {
        let app = app(MockAccountIndex::new(), MockChainRpc::new());
        assert_eq!(app.header().app_name(), "Explorer");
    }
}

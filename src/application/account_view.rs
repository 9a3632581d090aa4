use super::reactive::{switch_latest, terminate_on_error, until_error};
use crate::domain::{
    errors::ExplorerError,
    models::{
        AccountIndex, AccountName, Action, ChainRpc, ContractTableRows, EnrichedAccount,
        PriceQuote, TableRowsQuery,
    },
};
use futures::stream::{self, BoxStream, PollNext};
use futures::{future, Stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use typed_builder::TypedBuilder;

const CHANNEL_CAPACITY: usize = 16;

type Shared<T> = broadcast::Sender<Result<T, ExplorerError>>;

/// Collaborators an account view reads from.
#[derive(TypedBuilder)]
pub struct AccountSources<I, C, P> {
    index: Arc<I>,
    chain: Arc<C>,
    price_quote: Arc<P>,
}

impl<I, C, P> Clone for AccountSources<I, C, P> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            chain: self.chain.clone(),
            price_quote: self.price_quote.clone(),
        }
    }
}

impl<I, C, P> AccountSources<I, C, P>
where
    I: AccountIndex + 'static,
    C: ChainRpc + 'static,
    P: PriceQuote + 'static,
{
    /// Starts the derivation drivers and returns the view exposing their streams.
    ///
    /// Every driver subscribes before this returns, so no identifier passed to
    /// [`AccountView::navigate`] afterwards can be missed.
    pub fn activate(self) -> AccountView<P> {
        let (names, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (accounts, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (tables, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (actions_sent, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (actions_received, _) = broadcast::channel(CHANNEL_CAPACITY);

        let mut drivers = Vec::with_capacity(4);

        let (index, chain) = (self.index.clone(), self.chain.clone());
        drivers.push(tokio::spawn(switch_latest(
            name_stream(names.subscribe()),
            accounts.clone(),
            move |name| enrich_account(index.clone(), chain.clone(), name),
        )));

        let chain = self.chain.clone();
        drivers.push(tokio::spawn(switch_latest(
            table_triggers(names.subscribe(), accounts.subscribe()),
            tables.clone(),
            move |trigger| load_contract_tables(chain.clone(), trigger),
        )));

        let index = self.index.clone();
        drivers.push(tokio::spawn(switch_latest(
            name_stream(names.subscribe()),
            actions_sent.clone(),
            move |name| {
                let index = index.clone();
                async move {
                    tracing::info!("Fetching actions sent by {}", name);
                    Ok::<_, ExplorerError>(Some(index.get_account_actions_sent(&name).await?))
                }
            },
        )));

        let index = self.index;
        drivers.push(tokio::spawn(switch_latest(
            name_stream(names.subscribe()),
            actions_received.clone(),
            move |name| {
                let index = index.clone();
                async move {
                    tracing::info!("Fetching actions received by {}", name);
                    Ok::<_, ExplorerError>(Some(index.get_account_actions_received(&name).await?))
                }
            },
        )));

        AccountView {
            names,
            accounts,
            tables,
            actions_sent,
            actions_received,
            price_quote: self.price_quote,
            drivers,
        }
    }
}

/// Live view over one account at a time.
///
/// Each stream is hot: a subscriber only sees values emitted after it subscribed. Dropping the
/// view stops every driver and discards whatever work is still in flight.
pub struct AccountView<P> {
    names: broadcast::Sender<AccountName>,
    accounts: Shared<Arc<EnrichedAccount>>,
    tables: Shared<Vec<ContractTableRows>>,
    actions_sent: Shared<Vec<Action>>,
    actions_received: Shared<Vec<Action>>,
    price_quote: Arc<P>,
    drivers: Vec<JoinHandle<()>>,
}

impl<P: PriceQuote> AccountView<P> {
    /// Switches the view to `name`. Work still pending for the previous account is dropped.
    pub fn navigate(&self, name: AccountName) {
        tracing::info!("Navigating to account {}", name);
        if self.names.send(name).is_err() {
            tracing::warn!("Account view has no running drivers");
        }
    }

    pub fn names(&self) -> BoxStream<'static, AccountName> {
        BroadcastStream::new(self.names.subscribe())
            .filter_map(|name| future::ready(name.ok()))
            .boxed()
    }

    pub fn eos_price(&self) -> BoxStream<'static, Result<f64, ExplorerError>> {
        terminate_on_error(self.price_quote.eos_price().err_into::<ExplorerError>())
    }

    pub fn account(&self) -> BoxStream<'static, Result<Arc<EnrichedAccount>, ExplorerError>> {
        until_error(self.accounts.subscribe())
    }

    pub fn contract_tables(&self) -> BoxStream<'static, Result<Vec<ContractTableRows>, ExplorerError>> {
        until_error(self.tables.subscribe())
    }

    pub fn actions_sent(&self) -> BoxStream<'static, Result<Vec<Action>, ExplorerError>> {
        until_error(self.actions_sent.subscribe())
    }

    pub fn actions_received(&self) -> BoxStream<'static, Result<Vec<Action>, ExplorerError>> {
        until_error(self.actions_received.subscribe())
    }
}

impl<P> Drop for AccountView<P> {
    fn drop(&mut self) {
        for driver in &self.drivers {
            driver.abort();
        }
    }
}

fn name_stream(
    rx: broadcast::Receiver<AccountName>,
) -> impl Stream<Item = Result<AccountName, ExplorerError>> {
    BroadcastStream::new(rx).filter_map(|name| future::ready(name.ok().map(Ok)))
}

async fn enrich_account<I, C>(
    index: Arc<I>,
    chain: Arc<C>,
    name: AccountName,
) -> Result<Option<Arc<EnrichedAccount>>, ExplorerError>
where
    I: AccountIndex,
    C: ChainRpc,
{
    tracing::info!("Fetching account {}", name);
    let account = index.get_account(&name).await?;
    let resolved = &account.name;

    let (raw, balance, ram_price, tokens) = tokio::try_join!(
        chain.get_account(resolved),
        chain.get_currency_balance(resolved),
        chain.get_ram_price(),
        index.get_account_tokens(resolved),
    )?;

    tracing::info!("Account {} enriched with {} tokens", resolved, tokens.len());
    Ok(Some(Arc::new(EnrichedAccount {
        account,
        raw,
        balance,
        ram_price,
        tokens,
    })))
}

enum TableTrigger {
    Navigated,
    Loaded(Arc<EnrichedAccount>),
}

/// Navigation events interleaved with enriched accounts.
///
/// Navigation is polled first: the identifier that leads to an account is always sent before
/// that account, so a `Loaded` is never overtaken by its own `Navigated`.
fn table_triggers(
    names: broadcast::Receiver<AccountName>,
    accounts: broadcast::Receiver<Result<Arc<EnrichedAccount>, ExplorerError>>,
) -> impl Stream<Item = Result<TableTrigger, ExplorerError>> {
    let navigated = BroadcastStream::new(names)
        .filter_map(|name| future::ready(name.ok().map(|_| Ok(TableTrigger::Navigated))));
    let loaded = BroadcastStream::new(accounts).filter_map(|account| {
        future::ready(account.ok().map(|account| account.map(TableTrigger::Loaded)))
    });
    stream::select_with_strategy(navigated, loaded, |_: &mut ()| PollNext::Left)
}

async fn load_contract_tables<C: ChainRpc>(
    chain: Arc<C>,
    trigger: TableTrigger,
) -> Result<Option<Vec<ContractTableRows>>, ExplorerError> {
    let account = match trigger {
        TableTrigger::Navigated => return Ok(None),
        TableTrigger::Loaded(account) => account,
    };
    let Some(tables) = account.contract_tables() else {
        return Ok(None);
    };

    let name = &account.account.name;
    let queries = tables
        .iter()
        .map(|table| TableRowsQuery::for_table(name, table))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("Querying {} contract tables of {}", queries.len(), name);
    let rows = future::try_join_all(queries.iter().map(|query| chain.get_table_rows(query))).await?;

    Ok(Some(
        tables
            .iter()
            .cloned()
            .zip(rows)
            .map(|(table, rows)| ContractTableRows { table, rows })
            .collect(),
    ))
}

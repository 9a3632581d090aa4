use super::http::fetch_json;
use crate::domain::errors::CollaboratorError;
use crate::domain::models::PriceQuote;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;

const SERVICE: &str = "price quote";

/// Polls a CoinMarketCap ticker for the USD price of EOS.
#[derive(Clone)]
pub struct CmcPriceClient {
    http: reqwest::Client,
    ticker_url: String,
    poll_interval: Duration,
}

impl CmcPriceClient {
    pub fn new(ticker_url: &str, poll_interval: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            ticker_url: ticker_url.to_string(),
            poll_interval,
        }
    }

    async fn fetch_price(&self) -> Result<f64, CollaboratorError> {
        let ticker: Ticker = fetch_json(SERVICE, self.http.get(&self.ticker_url)).await?;
        tracing::debug!("EOS quoted at {} USD", ticker.data.quotes.usd.price);
        Ok(ticker.data.quotes.usd.price)
    }
}

impl PriceQuote for CmcPriceClient {
    /// One quote per poll, the first one right away.
    fn eos_price(&self) -> BoxStream<'static, Result<f64, CollaboratorError>> {
        let client = self.clone();
        IntervalStream::new(tokio::time::interval(self.poll_interval))
            .then(move |_| {
                let client = client.clone();
                async move { client.fetch_price().await }
            })
            .boxed()
    }
}

#[derive(Deserialize)]
struct Ticker {
    data: TickerData,
}

#[derive(Deserialize)]
struct TickerData {
    quotes: Quotes,
}

#[derive(Deserialize)]
struct Quotes {
    #[serde(rename = "USD")]
    usd: Quote,
}

#[derive(Deserialize)]
struct Quote {
    price: f64,
}

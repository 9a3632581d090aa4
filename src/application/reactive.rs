use futures::future::{self, BoxFuture, OptionFuture};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, Stream, StreamExt};
use std::future::Future;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Runs `project` for every item of `input`, keeping only the projection of the most recent
/// item alive and publishing what it settles to on `output`.
///
/// A new item drops the pending projection, so nothing derived from a superseded item is ever
/// published. A projection settling to `Ok(None)` publishes nothing. The first error, from
/// either the input or a projection, is published and ends the driver.
pub async fn switch_latest<S, I, O, E, F, Fut>(
    input: S,
    output: broadcast::Sender<Result<O, E>>,
    mut project: F,
) where
    S: Stream<Item = Result<I, E>>,
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<Option<O>, E>> + Send + 'static,
{
    tokio::pin!(input);
    let mut in_flight: Option<BoxFuture<'static, Result<Option<O>, E>>> = None;
    let mut input_open = true;

    loop {
        if !input_open && in_flight.is_none() {
            break;
        }

        tokio::select! {
            biased;
            next = input.next(), if input_open => match next {
                Some(Ok(item)) => {
                    if in_flight.is_some() {
                        tracing::debug!("Dropping superseded projection");
                    }
                    in_flight = Some(project(item).boxed());
                }
                Some(Err(e)) => {
                    let _ = output.send(Err(e));
                    break;
                }
                None => input_open = false,
            },
            Some(settled) = OptionFuture::from(in_flight.as_mut()) => {
                in_flight = None;
                match settled {
                    Ok(Some(value)) => {
                        // Nobody listening is fine, a consumer may subscribe later.
                        let _ = output.send(Ok(value));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = output.send(Err(e));
                        break;
                    }
                }
            }
        }
    }
}

/// Consumer side of a channel fed by [`switch_latest`]: yields values until the first error,
/// which is yielded too and ends the stream.
///
/// Notifications about lagged values are skipped.
pub fn until_error<T, E>(rx: broadcast::Receiver<Result<T, E>>) -> BoxStream<'static, Result<T, E>>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    terminate_on_error(BroadcastStream::new(rx).filter_map(|item| future::ready(item.ok())))
}

/// Yields items of `stream` up to and including the first error.
///
/// The inner stream is not polled again once the error is out, so the result ends even when the
/// source stays open.
pub fn terminate_on_error<S, T, E>(stream: S) -> BoxStream<'static, Result<T, E>>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    stream::unfold((stream.boxed(), false), |(mut inner, failed)| async move {
        if failed {
            return None;
        }
        let item = inner.next().await?;
        let failed = item.is_err();
        Some((item, (inner, failed)))
    })
    .boxed()
}

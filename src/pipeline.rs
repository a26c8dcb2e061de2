use std::future::Future;

use futures::{stream, StreamExt, TryStreamExt};

/// Feed `inputs` through `transform` one at a time, in order.
///
/// Each future is awaited to completion before the next input is taken; the
/// first error stops the run and nothing after it is started.
pub async fn run_sequential<I, T, O, E, F, Fut>(inputs: I, transform: F) -> Result<Vec<O>, E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    stream::iter(inputs).then(transform).try_collect().await
}

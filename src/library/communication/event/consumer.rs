use crate::library::EmptyResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Entity which may consume and process decoded messages of type `M`
///
/// Returned errors are logged by the subscription, the message is acknowledged regardless.
/// The subscription does not impose a timeout, so implementations should not block
/// indefinitely as this stalls every following message on the same queue.
#[async_trait]
pub trait Consumer<M: Send + 'static>: Send + Sync {
    /// Processes a message and returns whether it succeeded or failed
    async fn consume(&self, message: M) -> EmptyResult;
}

#[async_trait]
impl<M, C> Consumer<M> for Arc<C>
where
    M: Send + 'static,
    C: Consumer<M> + ?Sized,
{
    async fn consume(&self, message: M) -> EmptyResult {
        self.as_ref().consume(message).await
    }
}

/// Adapter turning a plain closure into a [`Consumer`]
///
/// ```
/// # use peril::library::communication::event::FnConsumer;
/// let consumer = FnConsumer::new(|paused: bool| println!("paused: {}", paused));
/// ```
pub struct FnConsumer<F> {
    function: F,
}

impl<F> FnConsumer<F> {
    /// Wraps the given closure
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

#[async_trait]
impl<M, F> Consumer<M> for FnConsumer<F>
where
    M: Send + 'static,
    F: Fn(M) + Send + Sync,
{
    async fn consume(&self, message: M) -> EmptyResult {
        (self.function)(message);
        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn invoke_wrapped_closure() {
        let sum = Arc::new(AtomicUsize::new(0));
        let target = sum.clone();
        let consumer = FnConsumer::new(move |value: usize| {
            target.fetch_add(value, Ordering::SeqCst);
        });

        Consumer::<usize>::consume(&consumer, 2).await.unwrap();
        Consumer::<usize>::consume(&consumer, 40).await.unwrap();

        assert_eq!(sum.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn share_consumers_through_arc() {
        let count = Arc::new(AtomicUsize::new(0));
        let target = count.clone();
        let consumer = Arc::new(FnConsumer::new(move |_: ()| {
            target.fetch_add(1, Ordering::SeqCst);
        }));

        Consumer::<()>::consume(&consumer.clone(), ()).await.unwrap();
        Consumer::<()>::consume(&consumer, ()).await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}

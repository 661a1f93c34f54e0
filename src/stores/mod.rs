//! Observable CRUD stores for budget, categories and items.
//!
//! Every store keeps its data together with loading and error bookkeeping.
//! Fetches record a failure in `error` and keep the previous data; mutations
//! record it and also return it to the caller.

mod budget;
mod categories;
mod items;

use std::future::Future;

use tokio::sync::watch;

pub use budget::BudgetStore;
pub use categories::CategoriesStore;
pub use items::ItemsStore;

use crate::error::Error;

/// Data held by a store plus its request bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState<T> {
    pub data: T,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Watch-backed holder shared by the concrete stores.
#[derive(Debug)]
struct StateCell<T> {
    tx: watch::Sender<ResourceState<T>>,
}

impl<T: Clone + Default> StateCell<T> {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(ResourceState::default());
        Self { tx }
    }

    fn snapshot(&self) -> ResourceState<T> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.tx.subscribe()
    }

    fn start(&self) {
        self.tx.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn finish(&self, outcome: Result<Option<T>, String>) {
        self.tx.send_modify(|s| {
            match outcome {
                Ok(Some(data)) => s.data = data,
                Ok(None) => {}
                Err(message) => s.error = Some(message),
            }
            s.is_loading = false;
        });
    }

    /// Run a fetch; failures land in `error` only.
    async fn load(&self, what: &'static str, fut: impl Future<Output = Result<T, Error>>) {
        self.start();
        match fut.await {
            Ok(data) => self.finish(Ok(Some(data))),
            Err(e) => {
                tracing::error!(error = %e, resource = what, "Failed to load");
                self.finish(Err(e.to_string()));
            }
        }
    }

    /// Run a mutation; failures land in `error` and are returned.
    async fn mutate<R>(&self, fut: impl Future<Output = Result<R, Error>>) -> Result<R, Error> {
        self.start();
        let result = fut.await;
        self.finish(result.as_ref().map(|_| None).map_err(ToString::to_string));
        result
    }

    fn set_data(&self, data: T) {
        self.tx.send_modify(|s| s.data = data);
    }
}

use tokio::sync::watch;

use super::{ResourceState, StateCell};
use crate::api::ApiClient;
use crate::error::Error;
use crate::types::CustomerId;

/// The customer's spending budget.
#[derive(Debug)]
pub struct BudgetStore {
    api: ApiClient,
    state: StateCell<f64>,
}

impl BudgetStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: StateCell::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<f64> {
        self.state.snapshot()
    }

    #[must_use]
    pub fn budget(&self) -> f64 {
        self.state.snapshot().data
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<f64>> {
        self.state.subscribe()
    }

    /// Load the budget. No-op for an empty customer id.
    pub async fn fetch(&self, customer_id: &CustomerId) {
        if customer_id.is_empty() {
            return;
        }
        self.state.load("budget", self.api.get_budget(customer_id)).await;
    }

    /// Register a new budget and keep it locally on success.
    ///
    /// # Errors
    ///
    /// Returns the backend error; it is also recorded in the store's `error`.
    pub async fn save(&self, customer_id: &CustomerId, budget: f64) -> Result<(), Error> {
        self.state
            .mutate(self.api.register_budget(customer_id, budget))
            .await?;
        self.state.set_data(budget);
        Ok(())
    }
}

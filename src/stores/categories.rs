use tokio::sync::watch;

use super::{ResourceState, StateCell};
use crate::api::ApiClient;
use crate::error::Error;
use crate::types::{Category, CategoryId, CustomerId};

/// Spending categories, oldest first.
#[derive(Debug)]
pub struct CategoriesStore {
    api: ApiClient,
    state: StateCell<Vec<Category>>,
}

impl CategoriesStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: StateCell::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<Vec<Category>> {
        self.state.snapshot()
    }

    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.state.snapshot().data
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<Vec<Category>>> {
        self.state.subscribe()
    }

    /// Load the category list, sorted by creation time. No-op for an empty customer id.
    pub async fn fetch(&self, customer_id: &CustomerId) {
        if customer_id.is_empty() {
            return;
        }
        self.state
            .load("categories", async {
                let mut categories = self.api.list_categories(customer_id).await?;
                categories.sort_by_key(|c| c.created);
                Ok::<_, Error>(categories)
            })
            .await;
    }

    /// # Errors
    ///
    /// Returns the backend error; it is also recorded in the store's `error`.
    pub async fn add(&self, customer_id: &CustomerId, name: &str) -> Result<CategoryId, Error> {
        let id = self
            .state
            .mutate(self.api.register_category(customer_id, name))
            .await?;
        self.fetch(customer_id).await;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns the backend error; it is also recorded in the store's `error`.
    pub async fn rename(
        &self,
        customer_id: &CustomerId,
        category_id: &CategoryId,
        name: &str,
    ) -> Result<(), Error> {
        self.state
            .mutate(self.api.update_category(customer_id, category_id, name))
            .await?;
        self.fetch(customer_id).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the backend error; it is also recorded in the store's `error`.
    pub async fn remove(
        &self,
        customer_id: &CustomerId,
        category_id: &CategoryId,
    ) -> Result<(), Error> {
        self.state
            .mutate(self.api.delete_category(customer_id, category_id))
            .await?;
        self.fetch(customer_id).await;
        Ok(())
    }
}

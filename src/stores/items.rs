use tokio::sync::watch;

use super::{ResourceState, StateCell};
use crate::api::{ApiClient, ItemUpdate};
use crate::error::Error;
use crate::types::{CustomerId, Item, ItemId};

/// Purchase line items in backend order.
#[derive(Debug)]
pub struct ItemsStore {
    api: ApiClient,
    state: StateCell<Vec<Item>>,
}

impl ItemsStore {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: StateCell::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<Vec<Item>> {
        self.state.snapshot()
    }

    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.state.snapshot().data
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<Vec<Item>>> {
        self.state.subscribe()
    }

    /// Load the item list. No-op for an empty customer id.
    pub async fn fetch(&self, customer_id: &CustomerId) {
        if customer_id.is_empty() {
            return;
        }
        self.state.load("items", self.api.list_items(customer_id)).await;
    }

    /// Register a purchase and reload the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; it is also recorded in the store's `error`.
    pub async fn add(
        &self,
        customer_id: &CustomerId,
        label: &str,
        price: Option<f64>,
    ) -> Result<ItemId, Error> {
        let id = self
            .state
            .mutate(self.api.register_item(customer_id, label, price))
            .await?;
        self.fetch(customer_id).await;
        Ok(id)
    }

    /// Change an item's price or category and reload the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; it is also recorded in the store's `error`.
    pub async fn edit(&self, update: &ItemUpdate) -> Result<(), Error> {
        self.state.mutate(self.api.update_item(update)).await?;
        self.fetch(&update.customer_id).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the backend error; it is also recorded in the store's `error`.
    pub async fn remove(&self, customer_id: &CustomerId, item_id: &ItemId) -> Result<(), Error> {
        self.state
            .mutate(self.api.delete_item(customer_id, item_id))
            .await?;
        self.fetch(customer_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::CategoryId;

    fn item_json(price: f64, category: Option<&str>) -> serde_json::Value {
        json!({
            "customer_id": "cust-1",
            "item_id": "item-1",
            "id": "lunch",
            "price": price,
            "category_id": category,
            "created": 100.0,
            "updated": 100.0
        })
    }

    #[tokio::test]
    async fn add_then_edit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/item/regist"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"item_id": "item-1"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/item/update"))
            .and(body_partial_json(json!({"category_id": "cat-1", "price": 800.0})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"updated": true}})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/item/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": [item_json(500.0, None)]})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/item/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": [item_json(800.0, Some("cat-1"))]})),
            )
            .mount(&server)
            .await;

        let store = ItemsStore::new(ApiClient::new(server.uri().parse().unwrap()));
        let customer = CustomerId::from("cust-1");

        let id = store.add(&customer, "lunch", Some(500.0)).await.unwrap();
        assert_eq!(store.items()[0].price, Some(500.0));

        store
            .edit(&ItemUpdate {
                customer_id: customer.clone(),
                item_id: id,
                category_id: Some(CategoryId::from("cat-1".to_string())),
                price: 800.0,
                created: Some(100),
            })
            .await
            .unwrap();

        let items = store.items();
        assert_eq!(items[0].price, Some(800.0));
        assert_eq!(items[0].category_id, Some(CategoryId::from("cat-1".to_string())));
    }

    #[tokio::test]
    async fn subscribers_observe_loading_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": [item_json(500.0, None)]}))
                    .set_delay(std::time::Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let store = ItemsStore::new(ApiClient::new(server.uri().parse().unwrap()));
        let mut rx = store.subscribe();

        let customer = CustomerId::from("cust-1");

        let (_, saw_loading) = tokio::join!(store.fetch(&customer), async {
            rx.wait_for(|s| s.is_loading).await.is_ok()
        });

        assert!(saw_loading);
        assert!(!store.state().is_loading);
        assert_eq!(store.items().len(), 1);
    }

    #[tokio::test]
    async fn failed_add_records_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "Missing required field: price"})),
            )
            .mount(&server)
            .await;

        let store = ItemsStore::new(ApiClient::new(server.uri().parse().unwrap()));
        let err = store
            .add(&CustomerId::from("cust-1"), "lunch", None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Missing required field: price");
        assert_eq!(
            store.state().error.as_deref(),
            Some("Missing required field: price")
        );
        assert!(store.items().is_empty());
    }
}

//! REST client for the item, category and budget endpoints.
//!
//! Successful responses wrap their payload as `{"result": ...}`; failures carry
//! `{"message": ...}`, which becomes the error text. Requests are sent without
//! the session's access token.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::types::{Category, CategoryId, CustomerId, Item, ItemId};

/// Fallback error texts when the backend gives no `message`.
pub mod messages {
    pub const FETCH_FAILED: &str = "failed to fetch";
    pub const REGISTER_FAILED: &str = "failed to register";
    pub const UPDATE_FAILED: &str = "failed to update";
    pub const DELETE_FAILED: &str = "failed to delete";
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ItemRegistered {
    item_id: ItemId,
}

#[derive(Deserialize)]
struct CategoryRegistered {
    category_id: CategoryId,
}

#[derive(Deserialize)]
struct BudgetResult {
    #[serde(default)]
    budget: Option<f64>,
}

/// Fields sent to `/api/v1/item/update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemUpdate {
    pub customer_id: CustomerId,
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

/// Client for the expense backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    /// Client for the backend rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| Error::Config(format!("API URL {base}{path}: {e}")))
    }

    /// Send a request and unwrap the `result` envelope.
    async fn send<T: DeserializeOwned>(
        request: RequestBuilder,
        fallback: &'static str,
    ) -> Result<Option<T>, Error> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| fallback.to_owned());
            tracing::warn!(status = status.as_u16(), message = %message, "API request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.result)
    }

    fn missing_result(fallback: &'static str) -> Error {
        Error::Api {
            status: 200,
            message: fallback.to_owned(),
        }
    }

    // ── Items ──────────────────────────────────────────────────────────

    /// Register a purchase. Returns the backend-assigned item id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn register_item(
        &self,
        customer_id: &CustomerId,
        label: &str,
        price: Option<f64>,
    ) -> Result<ItemId, Error> {
        let body = serde_json::json!({
            "customer_id": customer_id,
            "id": label,
            "price": price,
        });
        let request = self
            .http
            .post(self.endpoint("/api/v1/item/regist")?)
            .json(&body);
        Self::send::<ItemRegistered>(request, messages::REGISTER_FAILED)
            .await?
            .map(|r| r.item_id)
            .ok_or_else(|| Self::missing_result(messages::REGISTER_FAILED))
    }

    /// All items for a customer; an absent `result` reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn list_items(&self, customer_id: &CustomerId) -> Result<Vec<Item>, Error> {
        let request = self
            .http
            .get(self.endpoint("/api/v1/item/list")?)
            .query(&[("customer_id", customer_id.as_str())]);
        Ok(Self::send(request, messages::FETCH_FAILED).await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn update_item(&self, update: &ItemUpdate) -> Result<(), Error> {
        let request = self
            .http
            .put(self.endpoint("/api/v1/item/update")?)
            .json(update);
        Self::send::<serde_json::Value>(request, messages::UPDATE_FAILED).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn delete_item(&self, customer_id: &CustomerId, item_id: &ItemId) -> Result<(), Error> {
        let request = self
            .http
            .delete(self.endpoint("/api/v1/item/delete")?)
            .query(&[("customer_id", customer_id.as_str()), ("item_id", item_id.0.as_str())]);
        Self::send::<serde_json::Value>(request, messages::DELETE_FAILED).await?;
        Ok(())
    }

    // ── Categories ─────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn register_category(
        &self,
        customer_id: &CustomerId,
        name: &str,
    ) -> Result<CategoryId, Error> {
        let body = serde_json::json!({ "customer_id": customer_id, "name": name });
        let request = self
            .http
            .post(self.endpoint("/api/v1/category/regist")?)
            .json(&body);
        Self::send::<CategoryRegistered>(request, messages::REGISTER_FAILED)
            .await?
            .map(|r| r.category_id)
            .ok_or_else(|| Self::missing_result(messages::REGISTER_FAILED))
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn list_categories(&self, customer_id: &CustomerId) -> Result<Vec<Category>, Error> {
        let request = self
            .http
            .get(self.endpoint("/api/v1/category/list")?)
            .query(&[("customer_id", customer_id.as_str())]);
        Ok(Self::send(request, messages::FETCH_FAILED).await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn update_category(
        &self,
        customer_id: &CustomerId,
        category_id: &CategoryId,
        name: &str,
    ) -> Result<(), Error> {
        let body = serde_json::json!({
            "customer_id": customer_id,
            "category_id": category_id,
            "name": name,
        });
        let request = self
            .http
            .put(self.endpoint("/api/v1/category/update")?)
            .json(&body);
        Self::send::<serde_json::Value>(request, messages::UPDATE_FAILED).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn delete_category(
        &self,
        customer_id: &CustomerId,
        category_id: &CategoryId,
    ) -> Result<(), Error> {
        let request = self
            .http
            .delete(self.endpoint("/api/v1/category/delete")?)
            .query(&[
                ("customer_id", customer_id.as_str()),
                ("category_id", category_id.0.as_str()),
            ]);
        Self::send::<serde_json::Value>(request, messages::DELETE_FAILED).await?;
        Ok(())
    }

    // ── Budget ─────────────────────────────────────────────────────────

    /// Current budget; `0` when none has been registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn get_budget(&self, customer_id: &CustomerId) -> Result<f64, Error> {
        let request = self
            .http
            .get(self.endpoint("/api/v1/customer/budget")?)
            .query(&[("customer_id", customer_id.as_str())]);
        let result = Self::send::<BudgetResult>(request, messages::FETCH_FAILED).await?;
        Ok(result.and_then(|r| r.budget).unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend message, or [`Error::Http`] on network failure.
    pub async fn register_budget(&self, customer_id: &CustomerId, budget: f64) -> Result<(), Error> {
        let body = serde_json::json!({ "customer_id": customer_id, "budget": budget });
        let request = self
            .http
            .post(self.endpoint("/api/v1/customer/budget/regist")?)
            .json(&body);
        Self::send::<serde_json::Value>(request, messages::REGISTER_FAILED).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn customer() -> CustomerId {
        CustomerId::from("cust-1")
    }

    #[tokio::test]
    async fn register_item_returns_item_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/item/regist"))
            .and(body_json(json!({"customer_id": "cust-1", "id": "coffee", "price": 500.0})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"item_id": "item-9"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri().parse().unwrap());
        let id = api.register_item(&customer(), "coffee", Some(500.0)).await.unwrap();

        assert_eq!(id, ItemId::from("item-9".to_string()));
    }

    #[tokio::test]
    async fn list_items_sends_customer_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/item/list"))
            .and(query_param("customer_id", "cust-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": [{
                "customer_id": "cust-1",
                "item_id": "item-1",
                "id": "lunch",
                "price": 500.0,
                "created": 1700000000.0,
                "updated": 1700000000.0
            }]})))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri().parse().unwrap());
        let items = api.list_items(&customer()).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, Some(500.0));
        assert_eq!(items[0].created, 1_700_000_000);
    }

    #[tokio::test]
    async fn missing_result_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/category/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri().parse().unwrap());
        assert!(api.list_categories(&customer()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_message_becomes_error_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/category/regist"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "Missing required field: name"})),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri().parse().unwrap());
        let err = api.register_category(&customer(), "").await.unwrap_err();

        assert_eq!(err.to_string(), "Missing required field: name");
        assert!(matches!(err, Error::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn falls_back_to_default_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/item/delete"))
            .and(query_param("item_id", "item-1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri().parse().unwrap());
        let err = api
            .delete_item(&customer(), &ItemId::from("item-1".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), messages::DELETE_FAILED);
    }

    #[tokio::test]
    async fn budget_defaults_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/customer/budget"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri().parse().unwrap());
        assert_eq!(api.get_budget(&customer()).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn update_item_omits_absent_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/item/update"))
            .and(body_json(json!({"customer_id": "cust-1", "item_id": "item-1", "price": 2000.0})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"updated": true}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(server.uri().parse().unwrap());
        api.update_item(&ItemUpdate {
            customer_id: customer(),
            item_id: ItemId::from("item-1".to_string()),
            category_id: None,
            price: 2000.0,
            created: None,
        })
        .await
        .unwrap();
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let api = ApiClient::new("https://api.example.com/prod/".parse().unwrap());
        assert_eq!(
            api.endpoint("/api/v1/item/list").unwrap().as_str(),
            "https://api.example.com/prod/api/v1/item/list"
        );
    }
}

use derive_more::{Display, From, Into};
use serde::{Deserialize, Deserializer, Serialize, de};

/// Tenant key scoping every budget, category and item call.
///
/// The CLI uses the signed-in user's email; the backend treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Backend-assigned item key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct ItemId(pub String);

/// Backend-assigned category key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct CategoryId(pub String);

/// Profile derived from ID token claims at login.
///
/// Persisted as JSON under the `userInfo` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// A purchase line item as returned by `/api/v1/item/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub customer_id: CustomerId,
    pub item_id: ItemId,
    /// Caller-chosen label given at registration.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Epoch seconds.
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub created: i64,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub updated: i64,
}

/// A spending category as returned by `/api/v1/category/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub customer_id: CustomerId,
    pub category_id: CategoryId,
    pub name: String,
    /// Epoch seconds.
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub created: i64,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub updated: i64,
}

/// Whole-second timestamp that the backend may encode as `1700000000.0`.
fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        #[allow(clippy::cast_possible_truncation)]
        Ok(value as i64)
    } else {
        Err(de::Error::custom(format!("expected whole-second timestamp, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn profile_omits_absent_fields() {
        let profile = UserProfile {
            email: "a@b.com".into(),
            name: Some("A".into()),
            picture: None,
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert_eq!(json, r#"{"email":"a@b.com","name":"A"}"#);
    }

    #[test]
    fn profile_accepts_minimal_json() {
        let profile: UserProfile = serde_json::from_str(r#"{"email":"x@y.com"}"#).unwrap();
        assert_eq!(profile.email, "x@y.com");
        assert!(profile.name.is_none());
        assert!(profile.picture.is_none());
    }

    #[test]
    fn item_accepts_float_prices_and_missing_category() {
        let item: Item = serde_json::from_value(json!({
            "customer_id": "cust-1",
            "item_id": "item-1",
            "id": "coffee",
            "price": 500.0,
            "created": 1_700_000_000,
            "updated": 1_700_000_000
        }))
        .unwrap();

        assert_eq!(item.created, 1_700_000_000);

        assert_eq!(item.price, Some(500.0));
        assert!(item.category_id.is_none());
        assert_eq!(item.item_id, ItemId::from("item-1".to_string()));
    }

    #[test]
    fn timestamps_accept_backend_float_encoding() {
        let category: Category = serde_json::from_str(
            r#"{"customer_id":"cust-1","category_id":"cat-1","name":"Food","created":1700000000.0,"updated":1700000123.0}"#,
        )
        .unwrap();

        assert_eq!(category.created, 1_700_000_000);
        assert_eq!(category.updated, 1_700_000_123);
    }

    #[test]
    fn fractional_timestamp_is_rejected() {
        let result = serde_json::from_str::<Category>(
            r#"{"customer_id":"c","category_id":"k","name":"n","created":1.5}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn category_tolerates_missing_timestamps() {
        let category: Category = serde_json::from_value(json!({
            "customer_id": "cust-1",
            "category_id": "cat-1",
            "name": "食費"
        }))
        .unwrap();

        assert_eq!(category.name, "食費");
        assert_eq!(category.created, 0);
    }

    #[test]
    fn customer_id_displays_inner_value() {
        let id = CustomerId::from("a@b.com");
        assert_eq!(id.to_string(), "a@b.com");
        assert!(!id.is_empty());
        assert!(CustomerId::from("").is_empty());
    }
}

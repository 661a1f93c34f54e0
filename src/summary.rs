//! Spending totals behind the dashboard charts.

use std::collections::HashMap;

use crate::types::{Category, CategoryId, Item};

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Spending for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// `None` for the uncategorized bucket.
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub budget: f64,
    pub spent: f64,
    /// May be negative when over budget.
    pub remaining: f64,
    /// In category order; the uncategorized bucket comes last and only if non-empty.
    pub by_category: Vec<CategoryTotal>,
}

impl Summary {
    /// Sum item prices per category. Items without a price count as zero;
    /// items pointing at an unknown category are treated as uncategorized.
    #[must_use]
    pub fn compute(budget: f64, items: &[Item], categories: &[Category]) -> Self {
        let mut by_category: Vec<CategoryTotal> = categories
            .iter()
            .map(|c| CategoryTotal {
                category_id: Some(c.category_id.clone()),
                name: c.name.clone(),
                total: 0.0,
                count: 0,
            })
            .collect();
        let index: HashMap<&CategoryId, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (&c.category_id, i))
            .collect();

        let mut uncategorized = CategoryTotal {
            category_id: None,
            name: UNCATEGORIZED.to_owned(),
            total: 0.0,
            count: 0,
        };
        let mut spent = 0.0;

        for item in items {
            let price = item.price.unwrap_or_default();
            spent += price;
            let bucket = match item.category_id.as_ref().and_then(|id| index.get(id)) {
                Some(&i) => &mut by_category[i],
                None => &mut uncategorized,
            };
            bucket.total += price;
            bucket.count += 1;
        }

        if uncategorized.count > 0 {
            by_category.push(uncategorized);
        }

        Self {
            budget,
            spent,
            remaining: budget - spent,
            by_category,
        }
    }

    /// Fraction of the budget used, or `None` when no budget is set.
    #[must_use]
    pub fn usage_ratio(&self) -> Option<f64> {
        (self.budget > 0.0).then(|| self.spent / self.budget)
    }

    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.budget > 0.0 && self.spent > self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerId, ItemId};

    fn category(id: &str, name: &str) -> Category {
        Category {
            customer_id: CustomerId::from("c"),
            category_id: CategoryId::from(id.to_string()),
            name: name.into(),
            created: 0,
            updated: 0,
        }
    }

    fn item(price: Option<f64>, category: Option<&str>) -> Item {
        Item {
            customer_id: CustomerId::from("c"),
            item_id: ItemId::from("i".to_string()),
            id: "x".into(),
            price,
            category_id: category.map(|c| CategoryId::from(c.to_string())),
            created: 0,
            updated: 0,
        }
    }

    #[test]
    fn totals_per_category() {
        let categories = [category("food", "Food"), category("travel", "Travel")];
        let items = [
            item(Some(500.0), Some("food")),
            item(Some(300.0), Some("food")),
            item(Some(1200.0), Some("travel")),
            item(None, Some("travel")),
        ];

        let summary = Summary::compute(5000.0, &items, &categories);

        assert_eq!(summary.spent, 2000.0);
        assert_eq!(summary.remaining, 3000.0);
        assert_eq!(summary.by_category.len(), 2);
        assert_eq!(summary.by_category[0].total, 800.0);
        assert_eq!(summary.by_category[1].count, 2);
        assert_eq!(summary.usage_ratio(), Some(0.4));
        assert!(!summary.is_over_budget());
    }

    #[test]
    fn unknown_and_missing_categories_are_grouped() {
        let categories = [category("food", "Food")];
        let items = [item(Some(100.0), None), item(Some(50.0), Some("deleted"))];

        let summary = Summary::compute(100.0, &items, &categories);

        let last = summary.by_category.last().unwrap();
        assert_eq!(last.name, UNCATEGORIZED);
        assert!(last.category_id.is_none());
        assert_eq!(last.total, 150.0);
        assert_eq!(summary.remaining, -50.0);
        assert!(summary.is_over_budget());
    }

    #[test]
    fn no_budget_has_no_ratio() {
        let summary = Summary::compute(0.0, &[], &[]);
        assert!(summary.by_category.is_empty());
        assert_eq!(summary.usage_ratio(), None);
    }
}

//! Common types and data structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single catalog entry. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub in_stock: bool,
}

/// Product as it appears in datasets that carry no ids (the bundled JSON)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub in_stock: bool,
}

impl ProductRecord {
    /// Attach the positional id (`product-1`, `product-2`, ...)
    pub fn into_product(self, index: usize) -> Product {
        Product {
            id: format!("product-{}", index + 1),
            name: self.name,
            category: self.category,
            price: self.price,
            in_stock: self.in_stock,
        }
    }
}

/// Response shape of a product fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(rename = "data", alias = "items")]
    pub items: Vec<Product>,
    pub total: usize,
}

/// Field a sort can be applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Price,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Requested ordering of the filtered result.
///
/// Field and direction only exist together; any half-specified pair
/// collapses to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "SortParts", into = "SortParts")]
pub enum Sort {
    #[default]
    None,
    Price(SortOrder),
}

/// External `{field, order}` shape of a sort, each side optional
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortParts {
    pub field: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl Sort {
    pub fn from_parts(field: Option<SortField>, order: Option<SortOrder>) -> Self {
        match (field, order) {
            (Some(SortField::Price), Some(order)) => Sort::Price(order),
            _ => Sort::None,
        }
    }

    pub fn field(&self) -> Option<SortField> {
        match self {
            Sort::None => None,
            Sort::Price(_) => Some(SortField::Price),
        }
    }

    pub fn order(&self) -> Option<SortOrder> {
        match self {
            Sort::None => None,
            Sort::Price(order) => Some(*order),
        }
    }

    /// Next state of a clickable price header: none, ascending, descending
    pub fn cycled(self) -> Self {
        match self {
            Sort::None => Sort::Price(SortOrder::Asc),
            Sort::Price(SortOrder::Asc) => Sort::Price(SortOrder::Desc),
            Sort::Price(SortOrder::Desc) => Sort::None,
        }
    }
}

impl From<SortParts> for Sort {
    fn from(parts: SortParts) -> Self {
        Sort::from_parts(parts.field, parts.order)
    }
}

impl From<Sort> for SortParts {
    fn from(sort: Sort) -> Self {
        SortParts {
            field: sort.field(),
            order: sort.order(),
        }
    }
}

/// One side of a price range after parsing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceBound {
    Unbounded,
    At(f64),
}

impl PriceBound {
    /// Empty, unparseable and non-finite text all mean "no bound".
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => PriceBound::At(v),
            _ => PriceBound::Unbounded,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            PriceBound::Unbounded => None,
            PriceBound::At(v) => Some(*v),
        }
    }
}

/// Raw price bounds as typed by the user; empty string = absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceRange {
    pub min: String,
    pub max: String,
}

impl PriceRange {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn bounds(&self) -> (PriceBound, PriceBound) {
        (PriceBound::parse(&self.min), PriceBound::parse(&self.max))
    }

    pub fn contains(&self, price: f64) -> bool {
        let (min, max) = self.bounds();
        if let PriceBound::At(min) = min {
            if price < min {
                return false;
            }
        }
        if let PriceBound::At(max) = max {
            if price > max {
                return false;
            }
        }
        true
    }
}

/// User-chosen filter and sort criteria, independent of any dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    pub categories: BTreeSet<String>,
    pub search_term: String,
    pub price_range: PriceRange,
    pub only_in_stock: bool,
    pub sort: Sort,
}

impl FilterState {
    /// Same state with `category` added if absent, removed if present
    pub fn toggled_category(&self, category: &str) -> Self {
        let mut categories = self.categories.clone();
        if !categories.remove(category) {
            categories.insert(category.to_string());
        }
        Self {
            categories,
            ..self.clone()
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_pair_normalizes() {
        assert_eq!(Sort::from_parts(Some(SortField::Price), None), Sort::None);
        assert_eq!(Sort::from_parts(None, Some(SortOrder::Desc)), Sort::None);
        assert_eq!(
            Sort::from_parts(Some(SortField::Price), Some(SortOrder::Asc)),
            Sort::Price(SortOrder::Asc)
        );
    }

    #[test]
    fn test_sort_deserializes_half_pair_as_none() {
        let sort: Sort = serde_json::from_str(r#"{"field":"price","order":null}"#).unwrap();
        assert_eq!(sort, Sort::None);
        let sort: Sort = serde_json::from_str(r#"{"field":"price","order":"desc"}"#).unwrap();
        assert_eq!(sort, Sort::Price(SortOrder::Desc));
    }

    #[test]
    fn test_sort_cycle_returns_to_none() {
        let asc = Sort::None.cycled();
        assert_eq!(asc, Sort::Price(SortOrder::Asc));
        assert_eq!(asc.cycled(), Sort::Price(SortOrder::Desc));
        assert_eq!(asc.cycled().cycled(), Sort::None);
    }

    #[test]
    fn test_price_bound_parse() {
        assert_eq!(PriceBound::parse(""), PriceBound::Unbounded);
        assert_eq!(PriceBound::parse("abc"), PriceBound::Unbounded);
        assert_eq!(PriceBound::parse("NaN"), PriceBound::Unbounded);
        assert_eq!(PriceBound::parse("inf"), PriceBound::Unbounded);
        assert_eq!(PriceBound::parse(" 50 "), PriceBound::At(50.0));
        assert_eq!(PriceBound::parse("12.5"), PriceBound::At(12.5));
    }

    #[test]
    fn test_price_range_inclusive() {
        let range = PriceRange::new("50", "100");
        assert!(range.contains(50.0));
        assert!(range.contains(100.0));
        assert!(!range.contains(49.99));
        assert!(!range.contains(100.01));
        assert!(PriceRange::default().contains(0.0));
    }

    #[test]
    fn test_filter_state_wire_shape() {
        let json = r#"{
            "categories": ["B", "A"],
            "searchTerm": "wid",
            "priceRange": {"min": "10", "max": ""},
            "onlyInStock": true,
            "sort": {"field": "price", "order": "asc"}
        }"#;
        let state: FilterState = serde_json::from_str(json).unwrap();
        assert_eq!(state.categories.len(), 2);
        assert_eq!(state.search_term, "wid");
        assert_eq!(state.price_range.min, "10");
        assert!(state.only_in_stock);
        assert_eq!(state.sort, Sort::Price(SortOrder::Asc));
    }

    #[test]
    fn test_product_record_gets_positional_id() {
        let record = ProductRecord {
            name: "Widget".into(),
            category: "A".into(),
            price: 10.0,
            in_stock: true,
        };
        assert_eq!(record.into_product(0).id, "product-1");
    }
}

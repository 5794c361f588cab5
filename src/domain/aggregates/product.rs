//! Catalog aggregates: categories and products

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::domain::value_objects::Slug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl NewCategory {
    pub fn into_category(self) -> Category {
        Category { id: Uuid::now_v7(), name: self.name, slug: self.slug.into(), description: self.description, image_url: self.image_url }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl CategoryPatch {
    pub fn apply(self, category: &mut Category) {
        if let Some(name) = self.name { category.name = name; }
        if let Some(slug) = self.slug { category.slug = slug.into(); }
        if let Some(description) = self.description { category.description = Some(description); }
        if let Some(image_url) = self.image_url { category.image_url = Some(image_url); }
    }
}

/// A product as shown in the catalog. `price` is the live price; carts read it
/// until checkout, orders snapshot it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category_id: Uuid,
    pub brand: Option<String>,
    pub in_stock: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|compare| compare > self.price)
    }
}

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category_id: Uuid,
    pub brand: Option<String>,
    pub in_stock: bool,
    pub is_featured: bool,
    pub is_new: bool,
}

impl NewProduct {
    pub fn into_product(self) -> Product {
        Product {
            id: Uuid::now_v7(), name: self.name, slug: self.slug.into(), description: self.description,
            price: self.price, compare_at_price: self.compare_at_price, image_url: self.image_url,
            category_id: self.category_id, brand: self.brand, in_stock: self.in_stock,
            is_featured: self.is_featured, is_new: self.is_new, rating: 0.0, review_count: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub in_stock: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_new: Option<bool>,
}

impl ProductPatch {
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name { product.name = name; }
        if let Some(slug) = self.slug { product.slug = slug.into(); }
        if let Some(description) = self.description { product.description = Some(description); }
        if let Some(price) = self.price { product.price = price; }
        if let Some(compare) = self.compare_at_price { product.compare_at_price = Some(compare); }
        if let Some(image_url) = self.image_url { product.image_url = Some(image_url); }
        if let Some(category_id) = self.category_id { product.category_id = category_id; }
        if let Some(brand) = self.brand { product.brand = Some(brand); }
        if let Some(in_stock) = self.in_stock { product.in_stock = in_stock; }
        if let Some(is_featured) = self.is_featured { product.is_featured = is_featured; }
        if let Some(is_new) = self.is_new { product.is_new = is_new; }
    }
}

// =============================================================================
// Catalog queries
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum ProductSort {
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-desc")]
    PriceDesc,
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "rating")]
    Rating,
}

impl ProductSort {
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => a.name.cmp(&b.name),
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::Rating => b.rating.total_cmp(&a.rating),
        }
    }
}

/// Filter, sort and page over the catalog. Filters combine with AND.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
    pub is_new: Option<bool>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    pub sort: ProductSort,
    pub limit: u32,
    pub offset: u32,
}

impl ProductQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn matches(&self, product: &Product) -> bool {
        if self.category_id.is_some_and(|id| product.category_id != id) { return false; }
        if self.featured.is_some_and(|f| product.is_featured != f) { return false; }
        if self.is_new.is_some_and(|n| product.is_new != n) { return false; }
        if self.min_price.is_some_and(|min| product.price < min) { return false; }
        if self.max_price.is_some_and(|max| product.price > max) { return false; }
        if let Some(brand) = &self.brand {
            if product.brand.as_deref() != Some(brand.as_str()) { return false; }
        }
        if let Some(term) = self.search.as_deref().map(str::to_lowercase) {
            let in_name = product.name.to_lowercase().contains(&term);
            let in_description = product.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_name && !in_description { return false; }
        }
        true
    }
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category_id: None, featured: None, is_new: None, search: None, min_price: None,
            max_price: None, brand: None, sort: ProductSort::default(), limit: Self::DEFAULT_LIMIT, offset: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
}

#[cfg(test)]
pub(crate) fn sample_product(name: &str, price: Decimal, category_id: Uuid) -> Product {
    NewProduct {
        name: name.into(), slug: Slug::from_name(name).unwrap(), description: None, price,
        compare_at_price: None, image_url: None, category_id, brand: None, in_stock: true,
        is_featured: false, is_new: false,
    }
    .into_product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_filters() {
        let cat = Uuid::now_v7();
        let mut helmet = sample_product("Pro Trail Helmet", Decimal::new(14999, 2), cat);
        helmet.description = Some("Ventilated lightweight helmet".into());
        helmet.brand = Some("Giro".into());

        let query = ProductQuery { search: Some("VENTILATED".into()), ..ProductQuery::default() };
        assert!(query.matches(&helmet));

        let query = ProductQuery { brand: Some("POC".into()), ..ProductQuery::default() };
        assert!(!query.matches(&helmet));

        let query = ProductQuery { max_price: Some(Decimal::new(100, 0)), ..ProductQuery::default() };
        assert!(!query.matches(&helmet));

        let query = ProductQuery { category_id: Some(Uuid::now_v7()), ..ProductQuery::default() };
        assert!(!query.matches(&helmet));
    }

    #[test]
    fn test_sort_price() {
        let cat = Uuid::now_v7();
        let cheap = sample_product("Lights", Decimal::new(7999, 2), cat);
        let dear = sample_product("Road Bike", Decimal::new(249999, 2), cat);
        assert_eq!(ProductSort::PriceAsc.compare(&cheap, &dear), Ordering::Less);
        assert_eq!(ProductSort::PriceDesc.compare(&cheap, &dear), Ordering::Greater);
        assert_eq!(ProductSort::Name.compare(&cheap, &dear), Ordering::Less);
    }

    #[test]
    fn test_patch_changes_price() {
        let mut p = sample_product("Pedals", Decimal::new(11999, 2), Uuid::now_v7());
        ProductPatch { price: Some(Decimal::new(9999, 2)), ..ProductPatch::default() }.apply(&mut p);
        assert_eq!(p.price, Decimal::new(9999, 2));
        assert_eq!(p.name, "Pedals");
    }
}

//! Catalog service: categories and products.

use rust_decimal::Decimal;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPage, ProductPatch, ProductQuery, ProductSort,
};
use crate::domain::events::ProductEvent;
use crate::domain::value_objects::Slug;
use crate::publisher::EventPublisher;
use crate::storage::{StorageError, Store};
use crate::{FieldErrors, Result, StorefrontError};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    pub category_id: Uuid,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[serde(default = "in_stock_by_default")]
    pub in_stock: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new: bool,
}

fn in_stock_by_default() -> bool { true }

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    pub in_stock: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_new: Option<bool>,
}

/// Query string of `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    #[serde(alias = "category")]
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
    #[serde(alias = "new")]
    pub is_new: Option<bool>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ProductListParams {
    pub fn into_query(self) -> Result<ProductQuery> {
        let sort = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") => ProductSort::default(),
            Some(s) => {
                let de: StrDeserializer<'_, ValueError> = s.into_deserializer();
                ProductSort::deserialize(de)
                    .map_err(|_| StorefrontError::invalid("sortBy", format!("unknown sort order '{s}'")))?
            }
        };
        let blank_to_none = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(ProductQuery {
            category_id: self.category_id,
            featured: self.featured,
            is_new: self.is_new,
            search: blank_to_none(self.search),
            min_price: self.min_price,
            max_price: self.max_price,
            brand: blank_to_none(self.brand),
            sort,
            limit: self.limit.unwrap_or(ProductQuery::DEFAULT_LIMIT).min(ProductQuery::MAX_LIMIT),
            offset: self.offset.unwrap_or(0),
        })
    }
}

fn slug_for(explicit: Option<&str>, name: &str) -> Result<Slug> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Ok(Slug::new(slug)?),
        None => Ok(Slug::from_name(name)?),
    }
}

fn optional_slug(explicit: Option<&str>) -> Result<Option<Slug>> {
    explicit.map(Slug::new).transpose().map_err(Into::into)
}

fn check_prices(price: Option<Decimal>, compare_at_price: Option<Decimal>, errors: &mut FieldErrors) {
    if price.is_some_and(|p| p <= Decimal::ZERO) {
        errors.push("price", "Price must be greater than zero");
    }
    if compare_at_price.is_some_and(|p| p < Decimal::ZERO) {
        errors.push("compareAtPrice", "Compare-at price must not be negative");
    }
}

fn validated<T: Validate>(request: &T, extra: FieldErrors) -> Result<()> {
    let mut errors = match request.validate() {
        Ok(()) => FieldErrors::default(),
        Err(e) => FieldErrors::from_validator("", &e),
    };
    for e in extra.iter() {
        errors.push(e.field.clone(), e.message.clone());
    }
    if errors.is_empty() { Ok(()) } else { Err(StorefrontError::Validation(errors)) }
}

fn unknown_category() -> StorefrontError {
    StorefrontError::invalid("categoryId", "Category does not exist")
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher) -> Self { Self { store, events } }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn category_by_slug(&self, slug: &str) -> Result<Category> {
        self.store.get_category_by_slug(slug).await?.ok_or(StorefrontError::NotFound("Category"))
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_category(&self, request: CreateCategoryRequest) -> Result<Category> {
        validated(&request, FieldErrors::default())?;
        let category = NewCategory {
            slug: slug_for(request.slug.as_deref(), &request.name)?,
            name: request.name.trim().to_string(),
            description: request.description,
            image_url: request.image_url,
        };
        self.store.insert_category(category).await.map_err(|e| match e {
            StorageError::UniqueViolation { .. } => StorefrontError::Conflict("A category with this slug already exists".into()),
            other => other.into(),
        })
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn update_category(&self, id: Uuid, request: UpdateCategoryRequest) -> Result<Category> {
        validated(&request, FieldErrors::default())?;
        let patch = CategoryPatch {
            name: request.name.map(|n| n.trim().to_string()),
            slug: optional_slug(request.slug.as_deref())?,
            description: request.description,
            image_url: request.image_url,
        };
        match self.store.update_category(id, patch).await {
            Ok(Some(category)) => Ok(category),
            Ok(None) => Err(StorefrontError::NotFound("Category")),
            Err(StorageError::UniqueViolation { .. }) => Err(StorefrontError::Conflict("A category with this slug already exists".into())),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        match self.store.delete_category(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StorefrontError::NotFound("Category")),
            Err(StorageError::ForeignKeyViolation { .. }) => {
                Err(StorefrontError::Conflict("Category still has products; move or delete them first".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_products(&self, params: ProductListParams) -> Result<ProductPage> {
        let query = params.into_query()?;
        Ok(self.store.query_products(&query).await?)
    }

    pub async fn product_by_slug(&self, slug: &str) -> Result<Product> {
        self.store.get_product_by_slug(slug).await?.ok_or(StorefrontError::NotFound("Product"))
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(&self, request: CreateProductRequest) -> Result<Product> {
        let mut extra = FieldErrors::default();
        check_prices(Some(request.price), request.compare_at_price, &mut extra);
        validated(&request, extra)?;

        if self.store.get_category(request.category_id).await?.is_none() {
            return Err(unknown_category());
        }
        let product = NewProduct {
            slug: slug_for(request.slug.as_deref(), &request.name)?,
            name: request.name.trim().to_string(),
            description: request.description,
            price: request.price,
            compare_at_price: request.compare_at_price,
            image_url: request.image_url,
            category_id: request.category_id,
            brand: request.brand,
            in_stock: request.in_stock,
            is_featured: request.is_featured,
            is_new: request.is_new,
        };
        let product = self.store.insert_product(product).await.map_err(product_write_error)?;
        self.events.publish(ProductEvent::Created { product_id: product.id, slug: product.slug.clone() }).await;
        Ok(product)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn update_product(&self, id: Uuid, request: UpdateProductRequest) -> Result<Product> {
        let mut extra = FieldErrors::default();
        check_prices(request.price, request.compare_at_price, &mut extra);
        validated(&request, extra)?;

        if let Some(category_id) = request.category_id {
            if self.store.get_category(category_id).await?.is_none() {
                return Err(unknown_category());
            }
        }
        let patch = ProductPatch {
            name: request.name.map(|n| n.trim().to_string()),
            slug: optional_slug(request.slug.as_deref())?,
            description: request.description,
            price: request.price,
            compare_at_price: request.compare_at_price,
            image_url: request.image_url,
            category_id: request.category_id,
            brand: request.brand,
            in_stock: request.in_stock,
            is_featured: request.is_featured,
            is_new: request.is_new,
        };
        let product = self.store.update_product(id, patch).await.map_err(product_write_error)?
            .ok_or(StorefrontError::NotFound("Product"))?;
        self.events.publish(ProductEvent::Updated { product_id: product.id, price: product.price }).await;
        Ok(product)
    }

    /// Carts lose the product; placed orders keep their snapshot line.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_product(id).await? {
            return Err(StorefrontError::NotFound("Product"));
        }
        self.events.publish(ProductEvent::Deleted { product_id: id }).await;
        Ok(())
    }
}

fn product_write_error(e: StorageError) -> StorefrontError {
    match e {
        StorageError::UniqueViolation { .. } => StorefrontError::Conflict("A product with this slug already exists".into()),
        // category removed between the existence check and the write
        StorageError::ForeignKeyViolation { .. } => unknown_category(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStorage::new()), EventPublisher::disabled())
    }

    fn category(name: &str) -> CreateCategoryRequest {
        CreateCategoryRequest { name: name.into(), slug: None, description: None, image_url: None }
    }

    fn product(name: &str, price: &str, category_id: Uuid) -> CreateProductRequest {
        CreateProductRequest {
            name: name.into(), slug: None, description: None, price: price.parse().unwrap(),
            compare_at_price: None, image_url: None, category_id, brand: None, in_stock: true,
            is_featured: false, is_new: false,
        }
    }

    #[tokio::test]
    async fn test_category_slug_derived_and_unique() {
        let catalog = service();
        let road = catalog.create_category(category("Road Bikes")).await.unwrap();
        assert_eq!(road.slug, "road-bikes");
        assert_eq!(catalog.category_by_slug("road-bikes").await.unwrap().id, road.id);

        let err = catalog.create_category(category("Road  Bikes")).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_product_requires_existing_category() {
        let catalog = service();
        let err = catalog.create_product(product("Pedals", "119.99", Uuid::now_v7())).await.unwrap_err();
        let StorefrontError::Validation(errors) = err else { panic!("expected validation error") };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["categoryId"]);
    }

    #[tokio::test]
    async fn test_product_price_must_be_positive() {
        let catalog = service();
        let cat = catalog.create_category(category("Accessories")).await.unwrap();
        let err = catalog.create_product(product("Pedals", "0", cat.id)).await.unwrap_err();
        let StorefrontError::Validation(errors) = err else { panic!("expected validation error") };
        assert!(errors.fields().any(|f| f == "price"));
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let catalog = service();
        let cat = catalog.create_category(category("Accessories")).await.unwrap();
        let pedals = catalog.create_product(product("Pedals", "119.99", cat.id)).await.unwrap();

        assert!(matches!(catalog.delete_category(cat.id).await, Err(StorefrontError::Conflict(_))));
        catalog.delete_product(pedals.id).await.unwrap();
        catalog.delete_category(cat.id).await.unwrap();
        assert!(matches!(catalog.delete_category(cat.id).await, Err(StorefrontError::NotFound("Category"))));
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let catalog = service();
        let cat = catalog.create_category(category("Accessories")).await.unwrap();
        for (name, price) in [("Lights", "79.99"), ("Helmet", "149.99"), ("Pedals", "119.99")] {
            catalog.create_product(product(name, price, cat.id)).await.unwrap();
        }

        let params = ProductListParams { sort_by: Some("price-desc".into()), limit: Some(2), ..Default::default() };
        let page = catalog.list_products(params).await.unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Helmet", "Pedals"]);

        let params = ProductListParams { max_price: Some("100".parse().unwrap()), ..Default::default() };
        assert_eq!(catalog.list_products(params).await.unwrap().total, 1);
    }

    #[test]
    fn test_list_params_validation() {
        let params = ProductListParams { sort_by: Some("cheapest".into()), ..Default::default() };
        assert!(matches!(params.into_query(), Err(StorefrontError::Validation(_))));

        let params = ProductListParams { limit: Some(500), search: Some("  ".into()), ..Default::default() };
        let query = params.into_query().unwrap();
        assert_eq!(query.limit, ProductQuery::MAX_LIMIT);
        assert_eq!(query.search, None);
    }
}

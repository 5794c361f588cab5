//! Demo catalog for fresh installs.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::aggregates::{NewCategory, NewProduct, ProductQuery};
use crate::domain::value_objects::Slug;
use crate::storage::{CatalogRepository, StorageError};

const IMAGE_BASE: &str = "https://images.unsplash.com";

struct DemoCategory {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    image: &'static str,
}

struct DemoProduct {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    /// cents
    price: i64,
    compare_at_price: Option<i64>,
    image: &'static str,
    category: &'static str,
    brand: &'static str,
    is_featured: bool,
    is_new: bool,
}

const CATEGORIES: &[DemoCategory] = &[
    DemoCategory { name: "Road Bikes", slug: "road-bikes", description: "Speed and efficiency for every road", image: "photo-1511994298241-608e28f14fde" },
    DemoCategory { name: "Mountain Bikes", slug: "mountain-bikes", description: "Conquer any terrain with confidence", image: "photo-1605825831039-08b1cc0c3737" },
    DemoCategory { name: "Accessories", slug: "accessories", description: "Essential gear for every ride", image: "photo-1576435728678-68d0fbf94e91" },
    DemoCategory { name: "Apparel", slug: "apparel", description: "Performance clothing for cyclists", image: "photo-1489914099268-1dad649f76bf" },
];

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        name: "Carbon Elite Road Bike", slug: "carbon-elite-road-bike",
        description: "Lightweight carbon frame with precision handling for speed enthusiasts.",
        price: 249_999, compare_at_price: None, image: "photo-1532298229144-0ec0c57515c7",
        category: "road-bikes", brand: "Specialized", is_featured: true, is_new: true,
    },
    DemoProduct {
        name: "Speed Master X5", slug: "speed-master-x5",
        description: "Professional-grade road bike with aerodynamic design and premium components.",
        price: 159_999, compare_at_price: Some(189_999), image: "photo-1485965120184-e220f721d03e",
        category: "road-bikes", brand: "Trek", is_featured: true, is_new: false,
    },
    DemoProduct {
        name: "Pro Trail Helmet", slug: "pro-trail-helmet",
        description: "Ventilated, lightweight helmet with adjustable fit system for maximum comfort and protection.",
        price: 14_999, compare_at_price: None, image: "photo-1616778639452-bdee7e2b48f8",
        category: "accessories", brand: "Giro", is_featured: true, is_new: false,
    },
    DemoProduct {
        name: "Elite Cycling Jersey", slug: "elite-cycling-jersey",
        description: "Breathable, moisture-wicking fabric with aerodynamic fit for performance cycling.",
        price: 8_999, compare_at_price: None, image: "photo-1496147433903-1e62fdb6f4be",
        category: "apparel", brand: "Rapha", is_featured: true, is_new: false,
    },
    DemoProduct {
        name: "Trail Blazer XL", slug: "trail-blazer-xl",
        description: "Durable mountain bike with full suspension and responsive handling for challenging trails.",
        price: 189_999, compare_at_price: None, image: "photo-1507035895480-2b3156c31fc8",
        category: "mountain-bikes", brand: "Santa Cruz", is_featured: false, is_new: false,
    },
    DemoProduct {
        name: "Aero Road Helmet", slug: "aero-road-helmet",
        description: "Sleek, aerodynamic helmet designed for road cycling with integrated ventilation channels.",
        price: 12_999, compare_at_price: Some(16_999), image: "photo-1517649763962-0c623066013b",
        category: "accessories", brand: "POC", is_featured: false, is_new: false,
    },
    DemoProduct {
        name: "Pro Cycling Shoes", slug: "pro-cycling-shoes",
        description: "Lightweight cycling shoes with stiff carbon sole and precision fit for power transfer.",
        price: 14_999, compare_at_price: None, image: "photo-1508190074303-c0c4e4cf4c3e",
        category: "apparel", brand: "Shimano", is_featured: false, is_new: false,
    },
    DemoProduct {
        name: "Ultra Bright Bike Lights", slug: "ultra-bright-bike-lights",
        description: "High-powered, water-resistant bike lights for visibility and safety in all conditions.",
        price: 7_999, compare_at_price: None, image: "photo-1607748862156-7c548e7e98f4",
        category: "accessories", brand: "Light & Motion", is_featured: false, is_new: false,
    },
    DemoProduct {
        name: "Carbon Fiber Pedals", slug: "carbon-fiber-pedals",
        description: "Ultralight carbon pedals with durable bearings and wide platform for power and control.",
        price: 11_999, compare_at_price: None, image: "photo-1589236782461-414748c7a674",
        category: "accessories", brand: "Crank Brothers", is_featured: false, is_new: true,
    },
];

fn slug(value: &str) -> Result<Slug, StorageError> {
    Slug::new(value).map_err(|e| StorageError::Backend(format!("demo slug '{value}': {e}")))
}

/// Insert the demo categories and products unless the catalog already has
/// products. Returns the number of products created.
pub async fn seed_demo_catalog<S>(store: &S) -> Result<usize, StorageError>
where
    S: CatalogRepository + ?Sized,
{
    let any_product = ProductQuery { limit: 1, ..ProductQuery::default() };
    if store.query_products(&any_product).await?.total > 0 {
        tracing::debug!("catalog not empty, skipping demo data");
        return Ok(0);
    }

    let mut category_ids = HashMap::new();
    for c in CATEGORIES {
        let category = match store.get_category_by_slug(c.slug).await? {
            Some(existing) => existing,
            None => store.insert_category(NewCategory {
                name: c.name.to_string(),
                slug: slug(c.slug)?,
                description: Some(c.description.to_string()),
                image_url: Some(format!("{IMAGE_BASE}/{}", c.image)),
            }).await?,
        };
        category_ids.insert(c.slug, category.id);
    }

    for p in PRODUCTS {
        let category_id = *category_ids
            .get(p.category)
            .ok_or_else(|| StorageError::Backend(format!("demo product '{}' has unknown category", p.slug)))?;
        store.insert_product(NewProduct {
            name: p.name.to_string(),
            slug: slug(p.slug)?,
            description: Some(p.description.to_string()),
            price: Decimal::new(p.price, 2),
            compare_at_price: p.compare_at_price.map(|c| Decimal::new(c, 2)),
            image_url: Some(format!("{IMAGE_BASE}/{}", p.image)),
            category_id,
            brand: Some(p.brand.to_string()),
            in_stock: true,
            is_featured: p.is_featured,
            is_new: p.is_new,
        }).await?;
    }

    tracing::info!(categories = CATEGORIES.len(), products = PRODUCTS.len(), "seeded demo catalog");
    Ok(PRODUCTS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_seed_once() {
        let store = MemoryStorage::new();
        assert_eq!(seed_demo_catalog(&store).await.unwrap(), 9);
        assert_eq!(seed_demo_catalog(&store).await.unwrap(), 0);

        assert_eq!(store.list_categories().await.unwrap().len(), 4);
        let bike = store.get_product_by_slug("carbon-elite-road-bike").await.unwrap().unwrap();
        assert_eq!(bike.price, Decimal::new(249_999, 2));
        let featured = ProductQuery { featured: Some(true), ..ProductQuery::default() };
        assert_eq!(store.query_products(&featured).await.unwrap().total, 4);
    }
}

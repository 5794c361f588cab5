//! Postgres store.
//!
//! Uniqueness of carts per identity and of items per (cart, product) is held by
//! constraints (see `migrations/`). Every cart mutation takes `FOR UPDATE` on
//! the cart row first, so writes to one cart are serialised and order
//! placement never races an add. Order placement also holds `FOR SHARE` on the
//! products it prices, so a concurrent price change waits for it to commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use super::{CartRepository, CatalogRepository, OrderRepository, StorageError};
use crate::domain::aggregates::cart::same_lines;
use crate::domain::aggregates::{
    Address, Cart, CartIdentity, CartItem, CartLine, Category, CategoryPatch, NewCategory, NewOrder, NewProduct, Order,
    OrderDetails, OrderItem, OrderLine, OrderStatus, Product, ProductPage, ProductPatch, ProductQuery, ProductSort,
};
use crate::domain::value_objects::Quantity;

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, compare_at_price, image_url, category_id, brand, \
     in_stock, is_featured, is_new, rating, review_count, created_at";
const CATEGORY_COLUMNS: &str = "id, name, slug, description, image_url";
const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity";
const ORDER_COLUMNS: &str = "id, user_id, status, subtotal, discount, shipping_cost, tax, total, promo_code, \
     shipping_address, billing_address, payment_method, created_at, updated_at";

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or_default().to_string();
            match db.code().as_deref() {
                Some("23505") => return Self::UniqueViolation { constraint },
                Some("23503") => return Self::ForeignKeyViolation { constraint },
                _ => {}
            }
        }
        Self::Backend(e.to_string())
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow { id: Uuid, cart_id: Uuid, product_id: Uuid, quantity: i32 }

impl TryFrom<CartItemRow> for CartItem {
    type Error = StorageError;
    fn try_from(r: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(r.quantity).map_err(|_| StorageError::Backend(format!("negative quantity on cart item {}", r.id)))?;
        Ok(Self { id: r.id, cart_id: r.cart_id, product_id: r.product_id, quantity })
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    item_id: Uuid,
    cart_id: Uuid,
    quantity: i32,
    #[sqlx(flatten)]
    product: Product,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Option<Uuid>, status: String,
    subtotal: Decimal, discount: Decimal, shipping_cost: Decimal, tax: Decimal, total: Decimal,
    promo_code: Option<String>, shipping_address: Json<Address>, billing_address: Json<Address>,
    payment_method: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StorageError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let status = r.status.parse::<OrderStatus>().map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self {
            id: r.id, user_id: r.user_id, status, subtotal: r.subtotal, discount: r.discount,
            shipping_cost: r.shipping_cost, tax: r.tax, total: r.total, promo_code: r.promo_code,
            shipping_address: r.shipping_address.0, billing_address: r.billing_address.0,
            payment_method: r.payment_method, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow { id: Uuid, order_id: Uuid, product_id: Uuid, quantity: i32, price: Decimal }

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StorageError;
    fn try_from(r: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(r.quantity).map_err(|_| StorageError::Backend(format!("negative quantity on order item {}", r.id)))?;
        Ok(Self { id: r.id, order_id: r.order_id, product_id: r.product_id, quantity, price: r.price })
    }
}

fn collect_items<R, T>(rows: Vec<R>) -> Result<Vec<T>, StorageError>
where
    T: TryFrom<R, Error = StorageError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Cart items joined with their products, oldest first. `suffix` goes after
/// the `ORDER BY`, for a locking clause.
fn cart_lines_sql(suffix: &str) -> String {
    let columns: String = PRODUCT_COLUMNS.split(", ").map(|c| format!("p.{c}")).collect::<Vec<_>>().join(", ");
    format!(
        "SELECT ci.id AS item_id, ci.cart_id, ci.quantity, {columns} \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 ORDER BY ci.id{suffix}"
    )
}

fn collect_lines(rows: Vec<CartLineRow>) -> Result<Vec<CartLine>, StorageError> {
    rows.into_iter().map(|r| {
        let item = CartItem::try_from(CartItemRow { id: r.item_id, cart_id: r.cart_id, product_id: r.product.id, quantity: r.quantity })?;
        Ok(CartLine { item, product: r.product })
    }).collect()
}

fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Name => " ORDER BY name ASC, id ASC",
        ProductSort::PriceAsc => " ORDER BY price ASC, id ASC",
        ProductSort::PriceDesc => " ORDER BY price DESC, id ASC",
        ProductSort::Newest => " ORDER BY created_at DESC, id ASC",
        ProductSort::Rating => " ORDER BY rating DESC, id ASC",
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, q: &ProductQuery) {
    qb.push(" WHERE TRUE");
    if let Some(id) = q.category_id { qb.push(" AND category_id = ").push_bind(id); }
    if let Some(featured) = q.featured { qb.push(" AND is_featured = ").push_bind(featured); }
    if let Some(is_new) = q.is_new { qb.push(" AND is_new = ").push_bind(is_new); }
    if let Some(min) = q.min_price { qb.push(" AND price >= ").push_bind(min); }
    if let Some(max) = q.max_price { qb.push(" AND price <= ").push_bind(max); }
    if let Some(brand) = &q.brand { qb.push(" AND brand = ").push_bind(brand.clone()); }
    if let Some(term) = &q.search {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (name ILIKE ").push_bind(pattern.clone())
            .push(" OR description ILIKE ").push_bind(pattern)
            .push(")");
    }
}

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub fn pool(&self) -> &PgPool { &self.pool }
}

/// Row lock on the cart; `false` if the cart does not exist.
async fn lock_cart(tx: &mut Transaction<'_, Postgres>, cart_id: Uuid) -> Result<bool, StorageError> {
    let row = sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
        .bind(cart_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

#[async_trait]
impl CatalogRepository for PgStorage {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        Ok(sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"))
            .fetch_all(&self.pool).await?)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StorageError> {
        Ok(sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?)
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StorageError> {
        Ok(sqlx::query_as::<_, Category>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1"))
            .bind(slug).fetch_optional(&self.pool).await?)
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StorageError> {
        let c = category.into_category();
        Ok(sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories ({CATEGORY_COLUMNS}) VALUES ($1, $2, $3, $4, $5) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(c.id).bind(&c.name).bind(&c.slug).bind(&c.description).bind(&c.image_url)
        .fetch_one(&self.pool).await?)
    }

    async fn update_category(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>, StorageError> {
        Ok(sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET name = COALESCE($2, name), slug = COALESCE($3, slug), \
             description = COALESCE($4, description), image_url = COALESCE($5, image_url) \
             WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id).bind(patch.name).bind(patch.slug.map(String::from)).bind(patch.description).bind(patch.image_url)
        .fetch_optional(&self.pool).await?)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage, StorageError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count, query);
        let total: i64 = count.build().fetch_one(&self.pool).await?.try_get(0)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_product_filters(&mut select, query);
        select.push(order_by(query.sort));
        select.push(" LIMIT ").push_bind(i64::from(query.limit));
        select.push(" OFFSET ").push_bind(i64::from(query.offset));
        let products = select.build_query_as::<Product>().fetch_all(&self.pool).await?;

        Ok(ProductPage { products, total: u64::try_from(total).unwrap_or_default() })
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StorageError> {
        Ok(sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?)
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StorageError> {
        Ok(sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"))
            .bind(slug).fetch_optional(&self.pool).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorageError> {
        let p = product.into_product();
        Ok(sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(p.id).bind(&p.name).bind(&p.slug).bind(&p.description).bind(p.price).bind(p.compare_at_price)
        .bind(&p.image_url).bind(p.category_id).bind(&p.brand).bind(p.in_stock).bind(p.is_featured)
        .bind(p.is_new).bind(p.rating).bind(p.review_count).bind(p.created_at)
        .fetch_one(&self.pool).await?)
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>, StorageError> {
        Ok(sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET name = COALESCE($2, name), slug = COALESCE($3, slug), \
             description = COALESCE($4, description), price = COALESCE($5, price), \
             compare_at_price = COALESCE($6, compare_at_price), image_url = COALESCE($7, image_url), \
             category_id = COALESCE($8, category_id), brand = COALESCE($9, brand), \
             in_stock = COALESCE($10, in_stock), is_featured = COALESCE($11, is_featured), \
             is_new = COALESCE($12, is_new) WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id).bind(patch.name).bind(patch.slug.map(String::from)).bind(patch.description).bind(patch.price)
        .bind(patch.compare_at_price).bind(patch.image_url).bind(patch.category_id).bind(patch.brand)
        .bind(patch.in_stock).bind(patch.is_featured).bind(patch.is_new)
        .fetch_optional(&self.pool).await?)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StorageError> {
        // cart_items rows go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CartRepository for PgStorage {
    async fn find_or_create_cart(&self, identity: &CartIdentity) -> Result<Cart, StorageError> {
        let candidate = Cart::for_identity(identity);
        sqlx::query("INSERT INTO carts (id, user_id, session_id, created_at) VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING")
            .bind(candidate.id).bind(candidate.user_id).bind(&candidate.session_id).bind(candidate.created_at)
            .execute(&self.pool).await?;

        let query = match identity {
            CartIdentity::User(id) => sqlx::query_as::<_, Cart>("SELECT id, user_id, session_id, created_at FROM carts WHERE user_id = $1").bind(*id),
            CartIdentity::Session(token) => sqlx::query_as::<_, Cart>("SELECT id, user_id, session_id, created_at FROM carts WHERE session_id = $1").bind(token.clone()),
        };
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn cart_lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, StorageError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&cart_lines_sql(""))
            .bind(cart_id).fetch_all(&self.pool).await?;
        collect_lines(rows)
    }

    async fn add_item(&self, cart_id: Uuid, product_id: Uuid, quantity: Quantity) -> Result<Option<CartItem>, StorageError> {
        let mut tx = self.pool.begin().await?;
        if !lock_cart(&mut tx, cart_id).await? { return Err(StorageError::Conflict { entity: "cart" }); }
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "INSERT INTO cart_items ({CART_ITEM_COLUMNS}) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
             WHERE cart_items.quantity + EXCLUDED.quantity <= $5 RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(Uuid::now_v7()).bind(cart_id).bind(product_id).bind(quantity.as_i32()).bind(Quantity::MAX as i32)
        .fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        row.map(CartItem::try_from).transpose()
    }

    async fn set_item_quantity(&self, cart_id: Uuid, item_id: Uuid, quantity: Quantity) -> Result<Option<CartItem>, StorageError> {
        let mut tx = self.pool.begin().await?;
        if !lock_cart(&mut tx, cart_id).await? { return Ok(None); }
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND cart_id = $2 RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(item_id).bind(cart_id).bind(quantity.as_i32())
        .fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        row.map(CartItem::try_from).transpose()
    }

    async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await?;
        if !lock_cart(&mut tx, cart_id).await? { return Ok(false); }
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id).bind(cart_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, cart_id: Uuid) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await?;
        lock_cart(&mut tx, cart_id).await?;
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderRepository for PgStorage {
    async fn place_order(&self, cart_id: Uuid, expected: &[CartLine], order: NewOrder) -> Result<Order, StorageError> {
        let mut tx = self.pool.begin().await?;
        if !lock_cart(&mut tx, cart_id).await? { return Err(StorageError::Conflict { entity: "cart" }); }

        let rows = sqlx::query_as::<_, CartLineRow>(&cart_lines_sql(" FOR SHARE OF p"))
            .bind(cart_id).fetch_all(&mut *tx).await?;
        let current = collect_lines(rows)?;
        if !same_lines(&current, expected) {
            // dropping tx rolls back
            return Err(StorageError::Conflict { entity: "cart" });
        }

        let (order, items) = order.into_records();
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(order.id).bind(order.user_id).bind(order.status.as_str()).bind(order.subtotal).bind(order.discount)
        .bind(order.shipping_cost).bind(order.tax).bind(order.total).bind(&order.promo_code)
        .bind(Json(&order.shipping_address)).bind(Json(&order.billing_address)).bind(&order.payment_method)
        .bind(order.created_at).bind(order.updated_at)
        .execute(&mut *tx).await?;

        for item in &items {
            sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4, $5)")
                .bind(item.id).bind(item.order_id).bind(item.product_id)
                .bind(i32::try_from(item.quantity).map_err(|e| StorageError::Backend(e.to_string()))?)
                .bind(item.price)
                .execute(&mut *tx).await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<OrderDetails>, StorageError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
        else {
            return Ok(None);
        };
        let order = Order::try_from(row)?;

        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id).fetch_all(&self.pool).await?;
        let items: Vec<OrderItem> = collect_items(rows)?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(product_ids).fetch_all(&self.pool).await?;

        let items = items.into_iter().map(|item| {
            let product = products.iter().find(|p| p.id == item.product_id).cloned();
            OrderLine { item, product }
        }).collect();
        Ok(Some(OrderDetails { order, items }))
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>, StorageError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id).fetch_all(&self.pool).await?;
        collect_items(rows)
    }

    async fn update_order_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<Option<Order>, StorageError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id).bind(from.as_str()).bind(to.as_str())
        .fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Order::try_from(row).map(Some),
            None => {
                let exists: bool = sqlx::query("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                    .bind(id).fetch_one(&self.pool).await
                    .and_then(|r: PgRow| r.try_get(0))?;
                if exists { Err(StorageError::Conflict { entity: "order" }) } else { Ok(None) }
            }
        }
    }
}

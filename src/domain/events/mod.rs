//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, slug: String },
    Updated { product_id: Uuid, price: Decimal },
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Option<Uuid>, total: Decimal, item_count: usize },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

impl DomainEvent {
    /// Subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "ecommerce.product.created",
            Self::Product(ProductEvent::Updated { .. }) => "ecommerce.product.updated",
            Self::Product(ProductEvent::Deleted { .. }) => "ecommerce.product.deleted",
            Self::Order(OrderEvent::Placed { .. }) => "ecommerce.order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "ecommerce.order.status_changed",
        }
    }
}

impl From<ProductEvent> for DomainEvent {
    fn from(e: ProductEvent) -> Self { Self::Product(e) }
}

impl From<OrderEvent> for DomainEvent {
    fn from(e: OrderEvent) -> Self { Self::Order(e) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let id = Uuid::nil();
        let event = DomainEvent::from(OrderEvent::StatusChanged { order_id: id, from: OrderStatus::Pending, to: OrderStatus::Processing });
        assert_eq!(event.subject(), "ecommerce.order.status_changed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "status_changed");
        assert_eq!(json["from"], "pending");
        assert_eq!(json["to"], "processing");
    }
}

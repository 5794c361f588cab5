//! Trailhead Storefront
//!
//! Backend for a cycling-gear storefront.
//!
//! ## Features
//! - Product catalog with filtering, sorting and pagination
//! - Session- or user-scoped shopping carts with merge-on-add
//! - Server-side pricing (shipping threshold, promo codes, tax)
//! - Checkout that turns a cart into an immutable order and clears the cart atomically
//! - Admin management of products, categories and order status

pub mod config;
pub mod domain;
pub mod http;
pub mod publisher;
pub mod seed;
pub mod services;
pub mod state;
pub mod storage;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::value_objects::{QuantityError, SlugError};
use crate::storage::StorageError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot create order with empty cart")]
    EmptyCart,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorefrontError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}

impl From<QuantityError> for StorefrontError {
    fn from(e: QuantityError) -> Self { Self::invalid("quantity", e.to_string()) }
}

impl From<SlugError> for StorefrontError {
    fn from(e: SlugError) -> Self { Self::invalid("slug", e.to_string()) }
}

impl From<OrderError> for StorefrontError {
    fn from(e: OrderError) -> Self { Self::invalid("status", e.to_string()) }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(FieldErrors::from_validator("", &e)) }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

/// One offending input field, named as the client sent it (`shippingAddress.city`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError { field: field.into(), message: message.into() });
    }

    /// Collect `validator` failures, converting snake_case field names to the
    /// camelCase used on the wire and prefixing them with `prefix.` if given.
    pub fn from_validator(prefix: &str, errors: &validator::ValidationErrors) -> Self {
        let mut out = Self::default();
        out.extend_from_validator(prefix, errors);
        out
    }

    pub fn extend_from_validator(&mut self, prefix: &str, errors: &validator::ValidationErrors) {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(name, _)| *name);
        for (name, failures) in fields {
            let field = if prefix.is_empty() { camel_case(name) } else { format!("{prefix}.{}", camel_case(name)) };
            for failure in failures {
                let message = failure.message.as_ref().map_or_else(|| failure.code.to_string(), ToString::to_string);
                self.push(field.clone(), message);
            }
        }
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }
    pub fn fields(&self) -> impl Iterator<Item = &str> { self.0.iter().map(|e| e.field.as_str()) }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| format!("{}: {}", e.field, e.message)).collect();
        f.write_str(&parts.join("; "))
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Address;
    use validator::Validate;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("postal_code"), "postalCode");
        assert_eq!(camel_case("address1"), "address1");
    }

    #[test]
    fn test_field_errors_from_validator() {
        let errors = Address::default().validate().unwrap_err();
        let fields = FieldErrors::from_validator("shippingAddress", &errors);
        let names: Vec<_> = fields.fields().collect();
        assert!(names.contains(&"shippingAddress.firstName"));
        assert!(names.contains(&"shippingAddress.postalCode"));
        assert!(!names.contains(&"shippingAddress.phone"));
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn test_error_display() {
        let err = StorefrontError::invalid("quantity", "must be positive");
        assert_eq!(err.to_string(), "Validation failed: quantity: must be positive");
        assert_eq!(StorefrontError::NotFound("Cart item").to_string(), "Cart item not found");
    }
}

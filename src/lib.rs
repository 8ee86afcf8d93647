//! Storefront Orders
//!
//! Order pricing, fulfilment tracking and GST invoicing for a
//! cash-on-delivery storefront.
//!
//! ## Features
//! - Checkout with cart line merging and coupon discounts
//! - Totals calculation with a single free-shipping policy
//! - Admin order status and payment status updates
//! - Admin line-item edits with full totals recomputation
//! - Tax invoices (CGST + SGST) for screen and print

pub mod api;
pub mod config;
pub mod domain;
pub mod invoice;
pub mod publisher;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::coupon::CouponError;
use crate::domain::value_objects::ValueError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Sign-in required")]
    Unauthenticated,

    #[error("Admin access required")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Coupon(#[from] CouponError),
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self { StorefrontError::Storage(e.to_string()) }
}

impl From<ValueError> for StorefrontError {
    fn from(e: ValueError) -> Self { StorefrontError::Validation(e.to_string()) }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(e: validator::ValidationErrors) -> Self { StorefrontError::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

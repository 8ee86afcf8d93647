//! Order domain: value objects, pricing, lifecycle and aggregates.
pub mod aggregates;
pub mod coupon;
pub mod events;
pub mod lifecycle;
pub mod pricing;
pub mod value_objects;

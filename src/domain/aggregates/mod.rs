//! Aggregates module
pub mod order;
pub mod cart;

pub use order::{Address, LineItem, NewOrder, Order, OrderError, OrderSnapshot, PaymentMethod};
pub use cart::{Cart, CartItem};

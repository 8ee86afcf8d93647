//! Order fulfilment and payment states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// The five forward fulfilment steps shown on the progress bar.
    pub const FORWARD: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Index into [`OrderStatus::FORWARD`]; `None` for cancelled orders.
    pub fn progress_step(&self) -> Option<usize> {
        Self::FORWARD.iter().position(|s| s == self)
    }

    /// Delivered and cancelled read as final to customers. Nothing blocks
    /// further transitions out of them under [`TransitionPolicy::AdminOverride`].
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Payment axis, updated independently of [`OrderStatus`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [Self::Pending, Self::Paid, Self::Failed, Self::Refunded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Which status changes an admin update may make.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any of the six states may be set from any other, including backwards.
    #[default]
    AdminOverride,
    /// Forward moves along the fulfilment sequence, plus cancellation of
    /// orders that are not yet final.
    ForwardOnly,
}

impl TransitionPolicy {
    pub fn permits(&self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            Self::AdminOverride => true,
            Self::ForwardOnly => {
                if from == to { return true; }
                match (from.progress_step(), to.progress_step()) {
                    (Some(a), Some(b)) => b > a,
                    (Some(_), None) => !from.is_final(),
                    (None, _) => false,
                }
            }
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin_override" => Ok(Self::AdminOverride),
            "forward_only" => Ok(Self::ForwardOnly),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_steps() {
        assert_eq!(OrderStatus::Pending.progress_step(), Some(0));
        assert_eq!(OrderStatus::Delivered.progress_step(), Some(4));
        assert_eq!(OrderStatus::Cancelled.progress_step(), None);
    }

    #[test]
    fn test_admin_override_permits_every_pair() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert!(TransitionPolicy::AdminOverride.permits(from, to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_forward_only() {
        let p = TransitionPolicy::ForwardOnly;
        assert!(p.permits(OrderStatus::Pending, OrderStatus::Delivered));
        assert!(!p.permits(OrderStatus::Shipped, OrderStatus::Confirmed));
        assert!(p.permits(OrderStatus::Shipped, OrderStatus::Cancelled));
        assert!(!p.permits(OrderStatus::Delivered, OrderStatus::Cancelled));
        assert!(!p.permits(OrderStatus::Cancelled, OrderStatus::Pending));
    }

    #[test]
    fn test_parse_round_trip_names() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
        assert_eq!("refunded".parse::<PaymentStatus>().unwrap(), PaymentStatus::Refunded);
        assert_eq!("forward_only".parse::<TransitionPolicy>().unwrap(), TransitionPolicy::ForwardOnly);
    }
}

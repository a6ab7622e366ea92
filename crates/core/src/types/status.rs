//! Status enums for orders, payments and staff.
//!
//! Order statuses are a closed set with explicit transition rules. Older
//! rows used free text ("Paid", "canceled", mixed case), so parsing is
//! lenient while the database column is a strict Postgres enum.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// ```text
/// pending ──► paid ──► processing ──► fulfilled ──► refunded
///    │          │                                      ▲
///    │          └──────────────────────────────────────┘
///    ├──► processing
///    └──► cancelled
/// ```
///
/// `cancelled` and `refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet paid (cash on delivery) or awaiting staff.
    #[default]
    Pending,
    /// Paid through a gateway.
    Paid,
    /// Being packed.
    Processing,
    /// Shipped to the customer.
    Fulfilled,
    /// Cancelled before fulfilment. Stock has been restored.
    Cancelled,
    /// Money returned to the customer.
    Refunded,
}

/// A requested status change that the order lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change order status from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Paid,
        Self::Processing,
        Self::Fulfilled,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Statuses reachable from `self` in one step.
    #[must_use]
    pub const fn next_statuses(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Paid, Self::Processing, Self::Cancelled],
            Self::Paid => &[Self::Processing, Self::Refunded],
            Self::Processing => &[Self::Fulfilled],
            Self::Fulfilled => &[Self::Refunded],
            Self::Cancelled | Self::Refunded => &[],
        }
    }

    /// Whether the order can move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when `next` is not reachable from `self`.
    pub fn transition_to(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Only pending orders may be cancelled (and restocked).
    #[must_use]
    pub const fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "fulfilled" => Ok(Self::Fulfilled),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How an order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "shop.payment_method"))]
pub enum PaymentMethod {
    #[serde(rename = "cash_on_delivery")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "cash_on_delivery"))]
    CashOnDelivery,
    #[serde(rename = "paypal")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "paypal"))]
    PayPal,
    #[serde(rename = "vnpay")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "vnpay"))]
    VnPay,
}

impl PaymentMethod {
    /// Status a freshly committed order starts in.
    ///
    /// Gateway payments are confirmed before the order exists.
    #[must_use]
    pub const fn initial_status(&self) -> OrderStatus {
        match self {
            Self::CashOnDelivery => OrderStatus::Pending,
            Self::PayPal | Self::VnPay => OrderStatus::Paid,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashOnDelivery => write!(f, "Cash on delivery"),
            Self::PayPal => write!(f, "PayPal"),
            Self::VnPay => write!(f, "VNPay"),
        }
    }
}

/// Back-office staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.staff_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Full access, including supplier and staff management.
    Admin,
    /// Storage and order handling.
    Employee,
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Employee => write!(f, "employee"),
        }
    }
}

impl std::str::FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            _ => Err(format!("invalid staff role: {s}")),
        }
    }
}

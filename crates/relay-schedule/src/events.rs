//! Lifecycle events sent by a tenant's website

use relay_core::{LineItem, OrderDetails};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScheduleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEventKind {
    CartStarted,
    CartAbandoned,
    OrderPlaced,
    OrderDelivered,
}

impl LifecycleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEventKind::CartStarted => "cart-started",
            LifecycleEventKind::CartAbandoned => "cart-abandoned",
            LifecycleEventKind::OrderPlaced => "order-placed",
            LifecycleEventKind::OrderDelivered => "order-delivered",
        }
    }

    fn is_cart_event(&self) -> bool {
        matches!(
            self,
            LifecycleEventKind::CartStarted | LifecycleEventKind::CartAbandoned
        )
    }
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEventKind {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cart-started" => Ok(LifecycleEventKind::CartStarted),
            "cart-abandoned" => Ok(LifecycleEventKind::CartAbandoned),
            "order-placed" => Ok(LifecycleEventKind::OrderPlaced),
            "order-delivered" => Ok(LifecycleEventKind::OrderDelivered),
            other => Err(ScheduleError::UnknownEvent(other.to_string())),
        }
    }
}

/// Event body as posted by the website
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub cart_items: Option<Vec<LineItem>>,
    #[serde(default)]
    pub order_details: Option<OrderDetails>,
}

impl LifecycleEvent {
    /// Check the fields `kind` needs; returns the customer phone
    pub fn validate(&self, kind: LifecycleEventKind) -> Result<&str> {
        let phone = self
            .customer_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ScheduleError::Validation("customerPhone is required".into()))?;

        if kind.is_cart_event() && self.cart_items.is_none() {
            return Err(ScheduleError::Validation(format!(
                "cartItems is required for {}",
                kind
            )));
        }

        if !kind.is_cart_event() && self.order_details.is_none() {
            return Err(ScheduleError::Validation(format!(
                "orderDetails is required for {}",
                kind
            )));
        }

        Ok(phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_path_segment() {
        assert_eq!(
            "order-delivered".parse::<LifecycleEventKind>().unwrap(),
            LifecycleEventKind::OrderDelivered
        );
        assert!(matches!(
            "cart-emptied".parse::<LifecycleEventKind>(),
            Err(ScheduleError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_event_json() {
        let event: LifecycleEvent = serde_json::from_str(
            r#"{"customerPhone": "+15550001111", "cartItems": [{"id": 1, "name": "Ocean View Suite", "price": 299}]}"#,
        )
        .unwrap();

        assert_eq!(event.validate(LifecycleEventKind::CartStarted).unwrap(), "+15550001111");
        assert!(matches!(
            event.validate(LifecycleEventKind::OrderPlaced),
            Err(ScheduleError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_phone() {
        let event = LifecycleEvent {
            customer_phone: Some("  ".into()),
            cart_items: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            event.validate(LifecycleEventKind::CartAbandoned),
            Err(ScheduleError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_cart_is_accepted() {
        let event = LifecycleEvent {
            customer_phone: Some("+1".into()),
            cart_items: Some(vec![]),
            ..Default::default()
        };
        assert!(event.validate(LifecycleEventKind::CartStarted).is_ok());
    }
}

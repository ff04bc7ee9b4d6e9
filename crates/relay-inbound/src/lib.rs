//! relay-inbound: inbound WhatsApp webhooks
//!
//! Normalizes MyOperator and Twilio message webhooks into canonical
//! messages, opens booking leads on keyword matches and applies delivery
//! status updates.

mod classifier;
pub mod error;
pub mod payload;

pub use classifier::{Classified, Classifier};
pub use error::{InboundError, Result};
pub use payload::{InboundProvider, NormalizedMessage, normalize, parse_status};

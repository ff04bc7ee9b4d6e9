//! relay-whatsapp: outbound WhatsApp messaging
//!
//! Renders a provider-agnostic `MessageIntent` into the wire format of the
//! tenant's provider (Meta Cloud API, Twilio, Gupshup, MyOperator or the
//! mock), performs one HTTP call and normalizes the result.

pub mod cloud_api;
mod dispatch;
pub mod error;
pub mod gupshup;
mod mock;
pub mod myoperator;
mod sender;
pub mod twilio;

pub use cloud_api::CloudApiClient;
pub use dispatch::Dispatcher;
pub use error::{Result, WhatsAppError};
pub use gupshup::GupshupClient;
pub use mock::MockSender;
pub use myoperator::MyOperatorClient;
pub use sender::{
    MessageSender, ProviderEndpoints, ProviderSenderFactory, SendResult, SenderFactory, validate,
};
pub use twilio::TwilioClient;

//! Message intents and their builders

pub mod builder;
mod types;

pub use types::{MediaRef, MessageIntent, TemplateKind, TemplateParam};

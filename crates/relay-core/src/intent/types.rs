//! Provider-agnostic message intent

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approved WhatsApp template used for an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[serde(rename = "welcome_qualifier")]
    Welcome,
    #[serde(rename = "cart_reminder_1")]
    CartReminder1,
    #[serde(rename = "cart_reminder_2")]
    CartReminder2,
    OrderConfirmation,
    #[serde(rename = "post_purchase_review")]
    ReviewRequest,
    #[serde(rename = "upsell_offer")]
    Upsell,
    ProductSuggestions,
}

impl TemplateKind {
    /// Template name registered with the provider
    pub fn template_name(&self) -> &'static str {
        match self {
            TemplateKind::Welcome => "welcome_qualifier",
            TemplateKind::CartReminder1 => "cart_reminder_1",
            TemplateKind::CartReminder2 => "cart_reminder_2",
            TemplateKind::OrderConfirmation => "order_confirmation",
            TemplateKind::ReviewRequest => "post_purchase_review",
            TemplateKind::Upsell => "upsell_offer",
            TemplateKind::ProductSuggestions => "product_suggestions",
        }
    }

    pub fn all() -> [TemplateKind; 7] {
        [
            TemplateKind::Welcome,
            TemplateKind::CartReminder1,
            TemplateKind::CartReminder2,
            TemplateKind::OrderConfirmation,
            TemplateKind::ReviewRequest,
            TemplateKind::Upsell,
            TemplateKind::ProductSuggestions,
        ]
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template_name())
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKind::all()
            .into_iter()
            .find(|k| k.template_name() == s)
            .ok_or_else(|| format!("unknown template: {}", s))
    }
}

/// Typed template parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateParam {
    Text { text: String },
    Currency { amount: f64, code: String },
    Date { text: String },
}

impl TemplateParam {
    pub fn text(value: impl Into<String>) -> Self {
        TemplateParam::Text { text: value.into() }
    }

    pub fn currency(amount: f64, code: impl Into<String>) -> Self {
        TemplateParam::Currency {
            amount,
            code: code.into(),
        }
    }

    pub fn date(value: impl Into<String>) -> Self {
        TemplateParam::Date { text: value.into() }
    }

    /// Plain-text rendering, used by providers that only take strings
    pub fn display_value(&self) -> String {
        match self {
            TemplateParam::Text { text } | TemplateParam::Date { text } => text.clone(),
            TemplateParam::Currency { amount, code } => format_currency(*amount, code),
        }
    }
}

fn format_currency(amount: f64, code: &str) -> String {
    match code {
        "USD" => format!("${:.2}", amount),
        _ => format!("{:.2} {}", amount, code),
    }
}

/// Media attached to an outbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// What to send, independent of the provider that sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageIntent {
    /// Recipient phone number, E.164
    pub to: String,
    pub template: TemplateKind,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<TemplateParam>,
    /// Body parameters in template order
    #[serde(default)]
    pub parameters: Vec<TemplateParam>,
    /// Quick-reply button payloads in order
    #[serde(default)]
    pub buttons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
}

impl MessageIntent {
    pub fn new(to: impl Into<String>, template: TemplateKind) -> Self {
        Self {
            to: to.into(),
            template,
            language: "en".to_string(),
            header: None,
            parameters: Vec::new(),
            buttons: Vec::new(),
            media: None,
        }
    }

    pub fn with_header(mut self, header: TemplateParam) -> Self {
        self.header = Some(header);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<TemplateParam>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_button(mut self, payload: impl Into<String>) -> Self {
        self.buttons.push(payload.into());
        self
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media = Some(media);
        self
    }

    pub fn template_name(&self) -> &'static str {
        self.template.template_name()
    }

    /// Body parameters rendered as strings
    pub fn display_values(&self) -> Vec<String> {
        self.parameters.iter().map(TemplateParam::display_value).collect()
    }

    /// Freeform rendering of the template, for providers that need a body text
    pub fn fallback_text(&self) -> String {
        let values = self.display_values();
        let p = |i: usize| values.get(i).map(String::as_str).unwrap_or("");

        match self.template {
            TemplateKind::Welcome => format!(
                "Welcome to {}! Are you interested in accommodation, experiences or special offers?",
                p(0)
            ),
            TemplateKind::CartReminder1 => format!(
                "You left {} in your cart at {}. Complete your booking: {}",
                p(0),
                p(1),
                p(2)
            ),
            TemplateKind::CartReminder2 => format!(
                "Your stay at {} is still waiting. Reply to finish your booking.",
                p(0)
            ),
            TemplateKind::OrderConfirmation => format!(
                "Booking {} confirmed. Total {}. Check-in {}.",
                p(0),
                p(1),
                p(2)
            ),
            TemplateKind::ReviewRequest => {
                format!("How was {}? We would love to hear about your stay.", p(0))
            }
            TemplateKind::Upsell => format!(
                "Thanks for booking {}! Add {} for {}.",
                p(0),
                p(1),
                p(2)
            ),
            TemplateKind::ProductSuggestions => {
                let heading = self
                    .header
                    .as_ref()
                    .map(TemplateParam::display_value)
                    .unwrap_or_default();
                let lines: Vec<String> = values
                    .chunks(3)
                    .map(|c| c.join(" - "))
                    .collect();
                format!("{}\n{}", heading, lines.join("\n"))
            }
        }
    }
}

//! Intent builders, one per message kind
//!
//! Pure functions: they never touch the network or the store. Catalog data
//! is passed in already resolved.

use super::{MessageIntent, TemplateKind, TemplateParam};
use crate::models::{Amount, LineItem, OrderDetails, Product};
use crate::tenant::BrandConfig;

const DEFAULT_CART_ITEM: &str = "your accommodations";
const DEFAULT_STAY: &str = "your stay";
const MAX_SUGGESTIONS: usize = 3;

pub fn welcome(to: &str, brand: &BrandConfig) -> MessageIntent {
    MessageIntent::new(to, TemplateKind::Welcome)
        .with_parameters(vec![TemplateParam::text(&brand.name)])
        .with_button("QUALIFIER_ACCOMMODATION")
        .with_button("QUALIFIER_EXPERIENCE")
        .with_button("QUALIFIER_SPECIAL_OFFERS")
}

pub fn cart_reminder_1(to: &str, items: &[LineItem], brand: &BrandConfig) -> MessageIntent {
    let first_item = items
        .first()
        .map(|i| i.name.as_str())
        .unwrap_or(DEFAULT_CART_ITEM);

    MessageIntent::new(to, TemplateKind::CartReminder1).with_parameters(vec![
        TemplateParam::text(first_item),
        TemplateParam::text(&brand.name),
        TemplateParam::text(&brand.booking_url),
    ])
}

pub fn cart_reminder_2(to: &str, brand: &BrandConfig) -> MessageIntent {
    MessageIntent::new(to, TemplateKind::CartReminder2)
        .with_parameters(vec![TemplateParam::text(&brand.name)])
}

pub fn order_confirmation(to: &str, order: &OrderDetails) -> MessageIntent {
    MessageIntent::new(to, TemplateKind::OrderConfirmation).with_parameters(vec![
        TemplateParam::text(order.order_id.to_string()),
        total_param(order),
        TemplateParam::date(&order.estimated_delivery),
    ])
}

/// Numeric totals go out as currency; preformatted text is passed through
fn total_param(order: &OrderDetails) -> TemplateParam {
    match &order.total_amount {
        Amount::Number(amount) => TemplateParam::currency(*amount, &order.currency),
        Amount::Text(text) => TemplateParam::text(text.trim()),
    }
}

pub fn review_request(to: &str, order: &OrderDetails) -> MessageIntent {
    MessageIntent::new(to, TemplateKind::ReviewRequest)
        .with_parameters(vec![TemplateParam::text(purchased_name(order))])
        .with_button("REVIEW_YES")
}

/// Upsell candidate: the first experience, else the first product
pub fn select_upsell(catalog: &[Product]) -> Option<&Product> {
    catalog
        .iter()
        .find(|p| p.is_experience())
        .or_else(|| catalog.first())
}

/// `None` when the catalog is empty
pub fn upsell(to: &str, order: &OrderDetails, catalog: &[Product]) -> Option<MessageIntent> {
    let candidate = select_upsell(catalog)?;

    let intent = MessageIntent::new(to, TemplateKind::Upsell)
        .with_parameters(vec![
            TemplateParam::text(purchased_name(order)),
            TemplateParam::text(&candidate.name),
            TemplateParam::currency(candidate.price, &order.currency),
        ])
        .with_button(format!("VIEW_{}", candidate.id));

    Some(intent)
}

pub fn product_suggestions(to: &str, category: &str, products: &[Product]) -> MessageIntent {
    let parameters = products
        .iter()
        .take(MAX_SUGGESTIONS)
        .flat_map(|p| {
            [
                TemplateParam::text(&p.name),
                TemplateParam::text(&p.benefit),
                TemplateParam::text(format!("${}/night", p.price)),
            ]
        })
        .collect();

    MessageIntent::new(to, TemplateKind::ProductSuggestions)
        .with_header(TemplateParam::text(category_display_name(category)))
        .with_parameters(parameters)
        .with_button("VIEW_ACCOMMODATIONS")
}

pub fn category_display_name(category: &str) -> &str {
    match category {
        "accommodation" => "Luxury Accommodations",
        "experience" => "Resort Experiences",
        other => other,
    }
}

fn purchased_name(order: &OrderDetails) -> &str {
    order
        .items
        .first()
        .map(|i| i.name.as_str())
        .unwrap_or(DEFAULT_STAY)
}

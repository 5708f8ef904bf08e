//! HTML body of the order confirmation email.

use std::fmt::Write;

use orders::model::Order;
use shop::currency::{Currency, format_price};

pub fn order_subject(order: &Order) -> String {
    format!("Order Confirmation - #{}", order.id)
}

/// Render the confirmation sent once payment is approved.
pub fn render_order_confirmation(order: &Order) -> String {
    let currency = Currency::from_code(&order.currency).unwrap_or(Currency::Usd);
    let date = chrono::DateTime::parse_from_rfc3339(&order.created_at)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| order.created_at.clone());

    let mut rows = String::new();
    for item in &order.items {
        // Writing into a String cannot fail.
        let _ = write!(
            rows,
            r#"<tr style="border-bottom: 1px solid #E5E7EB;"><td style="padding: 10px;">{}</td><td style="padding: 10px; text-align: right;">{}</td><td style="padding: 10px; text-align: right;">{}</td></tr>"#,
            escape(&item.product.name),
            item.quantity,
            format_price(item.line_total(), currency),
        );
    }

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h1 style="color: #4F46E5; margin-bottom: 20px;">Hi, {name}! 👋</h1>
<div style="background-color: #F3F4F6; padding: 20px; border-radius: 8px; margin-bottom: 20px;">
<h2 style="color: #1F2937; margin-bottom: 15px;">Order Confirmation</h2>
<p style="margin-bottom: 10px;"><strong>Order ID:</strong> {id}</p>
<p style="margin-bottom: 10px;"><strong>Order Date:</strong> {date}</p>
<p style="margin-bottom: 10px;"><strong>Status:</strong> <span style="color: #059669; font-weight: bold;">Payment Approved ✓</span></p>
</div>
<div style="margin-bottom: 20px;">
<h2 style="color: #1F2937; margin-bottom: 15px;">Order Items</h2>
<table style="width: 100%; border-collapse: collapse;">
<thead><tr style="background-color: #F3F4F6;"><th style="padding: 10px; text-align: left;">Item</th><th style="padding: 10px; text-align: right;">Quantity</th><th style="padding: 10px; text-align: right;">Price</th></tr></thead>
<tbody>{rows}</tbody>
<tfoot><tr style="background-color: #F3F4F6;"><td colspan="2" style="padding: 10px; text-align: right; font-weight: bold;">Total:</td><td style="padding: 10px; text-align: right; font-weight: bold;">{total}</td></tr></tfoot>
</table>
</div>
<div style="background-color: #F3F4F6; padding: 20px; border-radius: 8px; margin-bottom: 20px;">
<h2 style="color: #1F2937; margin-bottom: 15px;">Delivery Instructions</h2>
<p style="margin: 0; color: #4B5563;">Our trader will contact you in-game with the message: "TFT item or something else". When you receive the trade request, <strong>IMPORTANT: PUT A RANDOM RARE ITEM IN THE TRADE WINDOW</strong>. This is a required security step. After confirming the items, complete the trade to receive your purchased items.</p>
</div>
<div style="margin-top: 20px; padding: 20px; background-color: #EEF2FF; border-radius: 8px;">
<p style="margin: 0; color: #4F46E5;">If you have any questions or need assistance, please contact our support team through the website.</p>
</div>
</div>"#,
        name = escape(&order.character_name),
        id = escape(&order.id),
        date = date,
        rows = rows,
        total = format_price(order.total_amount, currency),
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

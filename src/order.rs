use bigdecimal::BigDecimal;
use chrono::{DateTime, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::khqr::format_amount;
use crate::types::CartItem;

pub const STORE_NAME: &str = "Purat Site";
pub const ORDER_PREFIX: &str = "PS";
pub const PAYMENT_METHOD: &str = "Bakong KHQR (Manual)";
pub const PENDING_STATUS: &str = "Pending Verification";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    /// Telegram handle the shop replies to.
    pub username: String,
}

impl CustomerInfo {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.username.trim().is_empty()
    }
}

/// Backslash-escape the characters legacy Telegram Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `PS-<last six digits of unix millis>-<suffix>`.
pub fn format_order_id(unix_millis: i64, suffix: u32) -> String {
    let millis = unix_millis.to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    format!("{}-{}-{}", ORDER_PREFIX, tail, suffix)
}

pub fn new_order_id() -> String {
    let suffix = rand::thread_rng().gen_range(0..1000);
    format_order_id(Local::now().timestamp_millis(), suffix)
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: String,
    pub customer: CustomerInfo,
    pub items: Vec<CartItem>,
    pub total: BigDecimal,
    pub placed_at: DateTime<Local>,
}

impl Order {
    pub fn new(customer: CustomerInfo, items: Vec<CartItem>, total: BigDecimal) -> Self {
        Self {
            id: new_order_id(),
            customer,
            items,
            total,
            placed_at: Local::now(),
        }
    }

    /// Markdown caption sent with the receipt photo.
    pub fn caption(&self) -> String {
        let mut caption = format!("🛒 *NEW ORDER NOTIFICATION ({})*\n", STORE_NAME);
        caption += "━━━━━━━━━━━━━━━━━━━━━━\n";
        caption += &format!("🏷️ *Store:* {}\n\n", STORE_NAME);

        caption += &format!("👤 *Customer:* {}\n", escape_markdown(&self.customer.name));
        caption += &format!("📱 *Telegram:* {}\n", escape_markdown(&self.customer.username));
        caption += &format!("🆔 *Order ID:* {}\n\n", self.id);

        caption += "📦 *Order Details*\n";
        for item in &self.items {
            caption += &format!(
                "• {} (x{}) - ${:.2}\n",
                escape_markdown(&item.product.name),
                item.quantity,
                item.subtotal()
            );
        }
        caption += "\n";

        caption += &format!("💰 *Total Amount:* ${}\n", format_amount(&self.total));
        caption += &format!("💳 *Method:* {}\n", PAYMENT_METHOD);
        caption += &format!("💎 *Status:* {}\n", PENDING_STATUS);
        caption += &format!("⏰ *Time:* {}\n\n", self.placed_at.format("%Y-%m-%d %H:%M:%S"));

        caption += "📸 *Payment Receipt Attached Below*";
        caption
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::catalog;

    #[test]
    fn test_order_id_format() {
        assert_eq!(format_order_id(1_700_000_123_456, 7), "PS-123456-7");
        assert_eq!(format_order_id(42, 999), "PS-42-999");
    }

    #[test]
    fn test_new_order_id_shape() {
        let id = new_order_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "PS");
        assert_eq!(parts[1].len(), 6);
        assert!(parts[2].parse::<u32>().unwrap() < 1000);
    }

    #[test]
    fn test_caption_lists_items_and_total() {
        let mut cart = Cart::new();
        cart.add(catalog::find(1).unwrap());
        cart.add(catalog::find(1).unwrap());
        cart.add(catalog::find(6).unwrap());

        let customer = CustomerInfo {
            name: "Sokha".into(),
            username: "@sokha".into(),
        };
        let order = Order::new(customer, cart.items().to_vec(), cart.total());
        let caption = order.caption();

        assert!(caption.starts_with("🛒 *NEW ORDER NOTIFICATION (Purat Site)*"));
        assert!(caption.contains("👤 *Customer:* Sokha\n"));
        assert!(caption.contains("📱 *Telegram:* @sokha\n"));
        assert!(caption.contains(&format!("🆔 *Order ID:* {}\n", order.id)));
        assert!(caption.contains("• Neo-Glider X1 (x2) - $3.00\n"));
        assert!(caption.contains("• Lumina Smart Lamp (x1) - $1.50\n"));
        assert!(caption.contains("💰 *Total Amount:* $4.50\n"));
        assert!(caption.contains("💳 *Method:* Bakong KHQR (Manual)\n"));
        assert!(caption.ends_with("📸 *Payment Receipt Attached Below*"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("@john_doe"), "@john\\_doe");
        assert_eq!(escape_markdown("*a* `b` [c]"), "\\*a\\* \\`b\\` \\[c]");
        assert_eq!(escape_markdown("Sokha"), "Sokha");
    }

    #[test]
    fn test_caption_escapes_customer_fields() {
        let customer = CustomerInfo {
            name: "Sok_ha".into(),
            username: "@john_doe".into(),
        };
        let caption = Order::new(customer, Vec::new(), BigDecimal::from(0)).caption();

        assert!(caption.contains("👤 *Customer:* Sok\\_ha\n"));
        assert!(caption.contains("📱 *Telegram:* @john\\_doe\n"));
        assert!(!caption.contains("@john_doe"));
    }

    #[test]
    fn test_customer_info_completeness() {
        assert!(!CustomerInfo::default().is_complete());
        assert!(!CustomerInfo { name: "A".into(), username: "  ".into() }.is_complete());
        assert!(CustomerInfo { name: "A".into(), username: "@a".into() }.is_complete());
    }
}

//! Session-scoped cart: a mapping from cart key to line item. The cart holds
//! purchase intent until an order exists; it is never persisted elsewhere.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::{Session, session};
use utoipa::ToSchema;
use uuid::Uuid;

use super::keys;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    /// Provider product id of the base item.
    pub base_item_id: String,
    pub variant_id: Option<String>,
    pub custom_design_id: Option<Uuid>,
    pub title: String,
    pub variant_title: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn display_title(&self) -> &str {
        self.variant_title.as_deref().unwrap_or(&self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: BTreeMap<String, CartLine>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CartLine> {
        self.lines.get_mut(key)
    }

    pub fn insert(&mut self, key: String, line: CartLine) {
        self.lines.insert(key, line);
    }

    pub fn remove(&mut self, key: &str) -> Option<CartLine> {
        self.lines.remove(key)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&String, &CartLine)> {
        self.lines.iter()
    }

    /// Sum of `unit_price × quantity`, unrounded.
    pub fn total(&self) -> Decimal {
        self.lines.values().map(CartLine::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.values().map(|line| line.quantity).sum()
    }
}

/// Key for a catalog line: the product id, suffixed with the variant id.
pub fn line_key(product_id: &str, variant_id: Option<&str>) -> String {
    match variant_id {
        Some(variant) if !variant.is_empty() => format!("{product_id}-{variant}"),
        _ => product_id.to_string(),
    }
}

pub fn design_key(design_id: Uuid) -> String {
    format!("custom-{design_id}")
}

/// Current cart; an absent session entry reads as an empty cart.
pub async fn load(session: &Session) -> Result<Cart, session::Error> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

pub async fn save(session: &Session, cart: &Cart) -> Result<(), session::Error> {
    session.insert(keys::CART, cart).await
}

pub async fn clear(session: &Session) -> Result<(), session::Error> {
    session.remove::<Cart>(keys::CART).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    pub(crate) fn line(price: &str, quantity: u32) -> CartLine {
        CartLine {
            base_item_id: "A".into(),
            variant_id: Some("1".into()),
            custom_design_id: None,
            title: "Tee".into(),
            variant_title: Some("Black / L".into()),
            unit_price: Decimal::from_str(price).unwrap(),
            quantity,
            image_url: None,
            is_custom: false,
        }
    }

    #[test]
    fn keys() {
        assert_eq!(line_key("abc", Some("12")), "abc-12");
        assert_eq!(line_key("abc", None), "abc");
        assert_eq!(line_key("abc", Some("")), "abc");
        let id = Uuid::nil();
        assert_eq!(design_key(id), format!("custom-{id}"));
    }

    #[test]
    fn totals_sum_every_line() {
        let mut cart = Cart::default();
        cart.insert("a".into(), line("5000", 2));
        cart.insert("b".into(), line("12.345", 1));
        assert_eq!(cart.total(), Decimal::from_str("10012.345").unwrap());
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn serializes_as_plain_mapping() {
        let mut cart = Cart::default();
        cart.insert("a-1".into(), line("10.00", 1));
        let value = serde_json::to_value(&cart).unwrap();
        assert!(value.get("a-1").is_some());
    }
}

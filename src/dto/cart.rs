use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::cart::{Cart, CartLine};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    /// Printify product id.
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    /// New quantity; `0` removes the line.
    pub quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineView {
    pub key: String,
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: Decimal,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .lines()
                .map(|(key, line)| CartLineView {
                    key: key.clone(),
                    line_total: line.line_total(),
                    line: line.clone(),
                })
                .collect(),
            total: crate::money::round_money(cart.total()),
            item_count: cart.item_count(),
        }
    }
}

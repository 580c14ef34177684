use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::cart::CartView;

/// Contact and shipping details submitted at checkout. Missing names and
/// email fall back to the account's.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
    pub country: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSummary {
    pub cart: CartView,
    pub currency: String,
    pub paystack_public_key: Option<String>,
}

/// Query string Paystack appends when returning the customer.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

impl CallbackQuery {
    pub fn reference(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .or(self.trxref.as_deref())
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

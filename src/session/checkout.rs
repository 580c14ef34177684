//! The pending checkout: everything needed to materialize an order once the
//! gateway confirms payment, kept as one value under one session key.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::{Session, session};
use uuid::Uuid;

use super::{cart::Cart, keys};
use crate::clients::printify::PrintifyOrderRequest;

/// Snapshot taken at checkout time of who is buying what, and for how much.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
    pub total_amount: Decimal,
    pub cart: Cart,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub reference: String,
    pub intent: OrderIntent,
    pub provider_order: PrintifyOrderRequest,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(
        reference: String,
        intent: OrderIntent,
        provider_order: PrintifyOrderRequest,
        ttl: Duration,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            reference,
            intent,
            provider_order,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The live checkout session; an expired one is dropped and reads as absent.
pub async fn load(session: &Session) -> Result<Option<CheckoutSession>, session::Error> {
    let Some(checkout) = session.get::<CheckoutSession>(keys::CHECKOUT).await? else {
        return Ok(None);
    };
    if checkout.is_expired_at(Utc::now()) {
        tracing::warn!(
            reference = %checkout.reference,
            expired_at = %checkout.expires_at,
            "discarding expired checkout session"
        );
        clear(session).await?;
        return Ok(None);
    }
    Ok(Some(checkout))
}

pub async fn store(session: &Session, checkout: &CheckoutSession) -> Result<(), session::Error> {
    session.insert(keys::CHECKOUT, checkout).await
}

pub async fn clear(session: &Session) -> Result<(), session::Error> {
    session.remove::<CheckoutSession>(keys::CHECKOUT).await?;
    Ok(())
}

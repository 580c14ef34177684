//! Payment callback: verify with the gateway, then materialize exactly one
//! order per reference and forward it to the print provider.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    audit::{self, log_audit_best_effort},
    clients::paystack::Verification,
    entity::{
        CustomDesigns, Orders, Products, Users,
        custom_designs::{Column as DesignCol, DesignStatus},
        order_items::ActiveModel as OrderItemActive,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        products::Column as ProductCol,
    },
    error::AppResult,
    middleware::auth::MaybeUser,
    money::{from_minor_units, round_money, to_minor_units},
    session::{
        cart,
        checkout::{self, CheckoutSession, OrderIntent},
        flash,
    },
    state::AppState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    MissingReference,
    /// Verification could not be completed; funds may still have moved.
    GatewayUnavailable { reference: String },
    Failed { reference: String, message: String },
    AlreadyProcessed { reference: String },
    Completed { reference: String, order_id: Uuid },
    /// Paid at the gateway, but the checkout session is gone.
    IntentLost { reference: String },
    /// Paid at the gateway, but the order could not be written.
    PersistFailed { reference: String },
}

impl CallbackOutcome {
    /// Relative URL the customer is sent to next.
    pub fn redirect_path(&self) -> String {
        match self {
            CallbackOutcome::MissingReference | CallbackOutcome::GatewayUnavailable { .. } => {
                "/api/checkout".to_string()
            }
            CallbackOutcome::Failed { message, .. } => failure_path(message),
            CallbackOutcome::AlreadyProcessed { reference }
            | CallbackOutcome::Completed { reference, .. } => {
                format!("/api/orders/success/{}", urlencoding::encode(reference))
            }
            CallbackOutcome::IntentLost { reference } => failure_path(&format!(
                "Order details lost after payment. Contact support with reference {reference}."
            )),
            CallbackOutcome::PersistFailed { reference } => failure_path(&format!(
                "Payment successful, but we could not record your order. Contact support with reference {reference}."
            )),
        }
    }
}

fn failure_path(message: &str) -> String {
    format!("/api/orders/failure?message={}", urlencoding::encode(message))
}

pub async fn handle_callback(
    state: &AppState,
    session: &Session,
    current_user: &MaybeUser,
    reference: Option<&str>,
) -> AppResult<CallbackOutcome> {
    let Some(reference) = reference else {
        tracing::warn!("payment callback without reference");
        flash::push(session, "Payment reference not found.").await?;
        return Ok(CallbackOutcome::MissingReference);
    };
    let reference = reference.to_string();

    let pending = checkout::load(session).await?;
    match pending.as_ref().map(|c| c.reference.as_str()) {
        Some(held) if held == reference => {}
        held => tracing::warn!(
            %reference,
            session_reference = held.unwrap_or("-"),
            "callback reference differs from session; verifying gateway reference"
        ),
    }

    let verification = match verify(state, &reference).await {
        Some(verification) => verification,
        None => {
            flash::push(
                session,
                "Could not verify payment. Contact support if you were debited.",
            )
            .await?;
            return Ok(CallbackOutcome::GatewayUnavailable { reference });
        }
    };

    if !verification.success {
        tracing::warn!(%reference, message = %verification.message, "payment not successful");
        return Ok(CallbackOutcome::Failed {
            reference,
            message: verification.message,
        });
    }

    let viewer = current_user.0.as_ref().map(|u| u.user_id);
    match order_exists(&state.orm, &reference).await {
        Ok(true) => return already_processed(session, reference).await,
        Ok(false) => {}
        Err(err) => return Ok(persist_failed(state, reference, viewer, &err).await),
    }

    let Some(pending) = pending else {
        tracing::error!(
            %reference,
            amount = ?verification.amount,
            customer_email = ?verification.customer_email,
            "payment verified but checkout session is missing; manual reconciliation required"
        );
        log_audit_best_effort(
            &state.pool,
            viewer,
            audit::RECONCILIATION_GAP,
            Some("orders"),
            Some(serde_json::json!({
                "reference": reference,
                "amount": verification.amount,
                "currency": verification.currency,
                "customer_email": verification.customer_email,
            })),
        )
        .await;
        return Ok(CallbackOutcome::IntentLost { reference });
    };

    check_amount(state, &reference, &pending.intent, &verification).await;

    let owner = match resolve_owner(&state.orm, &pending.intent, current_user).await {
        Ok(owner) => owner,
        Err(err) => return Ok(persist_failed(state, reference, viewer, &err).await),
    };
    // The checkout session stays on failure so a retried callback can succeed.
    let order = match record_paid_order(&state.orm, &reference, &pending.intent, owner).await {
        Ok(OrderRecord::Created(order)) => order,
        Ok(OrderRecord::Duplicate) => {
            tracing::info!(%reference, "order inserted concurrently; treating as processed");
            return already_processed(session, reference).await;
        }
        Err(err) => return Ok(persist_failed(state, reference, owner, &err).await),
    };
    tracing::info!(%reference, order_id = %order.id, "order created");

    forward_to_provider(state, &pending).await;

    finish_checkout(session).await?;
    flash::push(session, "Payment successful! Your order has been placed.").await?;
    Ok(CallbackOutcome::Completed {
        reference,
        order_id: order.id,
    })
}

/// `None` when the gateway is missing or unreachable.
async fn verify(state: &AppState, reference: &str) -> Option<Verification> {
    let gateway = match state.payments() {
        Ok(gateway) => gateway,
        Err(err) => {
            tracing::error!(reference, error = %err, "cannot verify payment");
            return None;
        }
    };
    match gateway.verify(reference).await {
        Ok(verification) => Some(verification),
        Err(err) => {
            tracing::error!(
                reference,
                error = %err,
                retryable = err.is_retryable(),
                "payment verification failed"
            );
            None
        }
    }
}

async fn order_exists(orm: &DatabaseConnection, reference: &str) -> Result<bool, DbErr> {
    Ok(Orders::find()
        .filter(OrderCol::PaymentReference.eq(reference))
        .one(orm)
        .await?
        .is_some())
}

async fn check_amount(
    state: &AppState,
    reference: &str,
    intent: &OrderIntent,
    verification: &Verification,
) {
    let expected = to_minor_units(intent.total_amount);
    let Some(paid) = verification.amount else {
        return;
    };
    if expected == Some(paid) {
        return;
    }
    tracing::warn!(
        reference,
        ?expected,
        paid,
        paid_amount = %from_minor_units(paid),
        "verified amount differs from order total"
    );
    log_audit_best_effort(
        &state.pool,
        intent.user_id,
        audit::AMOUNT_MISMATCH,
        Some("orders"),
        Some(serde_json::json!({ "reference": reference, "expected": expected, "paid": paid })),
    )
    .await;
}

/// The user captured at checkout if they still exist, else whoever is logged in.
async fn resolve_owner(
    orm: &DatabaseConnection,
    intent: &OrderIntent,
    current_user: &MaybeUser,
) -> Result<Option<Uuid>, DbErr> {
    if let Some(user_id) = intent.user_id {
        if Users::find_by_id(user_id).one(orm).await?.is_some() {
            return Ok(Some(user_id));
        }
        tracing::warn!(%user_id, "checkout user no longer exists; falling back to session user");
    }
    Ok(current_user.0.as_ref().map(|user| user.user_id))
}

async fn already_processed(session: &Session, reference: String) -> AppResult<CallbackOutcome> {
    tracing::info!(%reference, "payment already processed");
    finish_checkout(session).await?;
    flash::push(session, "Payment already processed.").await?;
    Ok(CallbackOutcome::AlreadyProcessed { reference })
}

async fn persist_failed(
    state: &AppState,
    reference: String,
    user_id: Option<Uuid>,
    err: &DbErr,
) -> CallbackOutcome {
    tracing::error!(%reference, error = %err, "paid order could not be persisted");
    log_audit_best_effort(
        &state.pool,
        user_id,
        audit::ORDER_PERSIST_FAILED,
        Some("orders"),
        Some(serde_json::json!({ "reference": reference, "error": err.to_string() })),
    )
    .await;
    CallbackOutcome::PersistFailed { reference }
}

/// Outcome of writing a verified payment.
#[derive(Debug)]
pub enum OrderRecord {
    Created(OrderModel),
    /// An order for this reference was already written.
    Duplicate,
}

/// Writes the order for a verified `reference`. A unique violation counts as a
/// duplicate only when an order for the same reference now exists; any other
/// collision is returned as an error.
pub async fn record_paid_order(
    orm: &DatabaseConnection,
    reference: &str,
    intent: &OrderIntent,
    user_id: Option<Uuid>,
) -> Result<OrderRecord, DbErr> {
    match persist_order(orm, reference, intent, user_id).await {
        Ok(order) => Ok(OrderRecord::Created(order)),
        Err(err) if is_unique_violation(&err) => {
            if order_exists(orm, reference).await? {
                Ok(OrderRecord::Duplicate)
            } else {
                Err(err)
            }
        }
        Err(err) => Err(err),
    }
}

async fn persist_order(
    orm: &DatabaseConnection,
    reference: &str,
    intent: &OrderIntent,
    user_id: Option<Uuid>,
) -> Result<OrderModel, DbErr> {
    let now = Utc::now();
    let txn = orm.begin().await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        first_name: Set(intent.first_name.clone()),
        last_name: Set(intent.last_name.clone()),
        email: Set(intent.email.clone()),
        phone: Set(intent.phone.clone()),
        address: Set(intent.address.clone()),
        city: Set(intent.city.clone()),
        state: Set(intent.state.clone()),
        zipcode: Set(intent.zipcode.clone()),
        country: Set(intent.country.clone()),
        total_amount: Set(round_money(intent.total_amount)),
        paid: Set(true),
        payment_reference: Set(reference.to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut design_ids = Vec::new();
    for (_, line) in intent.cart.lines() {
        let product_id = Products::find()
            .filter(ProductCol::PrintifyId.eq(line.base_item_id.as_str()))
            .one(&txn)
            .await?
            .map(|product| product.id);
        let custom_design_id = match line.custom_design_id {
            Some(id) => CustomDesigns::find_by_id(id).one(&txn).await?.map(|d| d.id),
            None => None,
        };
        let quantity = i32::try_from(line.quantity)
            .map_err(|_| DbErr::Custom(format!("quantity {} out of range", line.quantity)))?;

        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product_id),
            custom_design_id: Set(custom_design_id),
            product_title: Set(line.title.clone()),
            variant_title: Set(line.variant_title.clone()),
            quantity: Set(quantity),
            price_at_purchase: Set(round_money(line.unit_price)),
            printify_variant_id: Set(line.variant_id.clone()),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        design_ids.extend(custom_design_id);
    }

    if !design_ids.is_empty() {
        CustomDesigns::update_many()
            .col_expr(DesignCol::Status, Expr::value(DesignStatus::OrderCreated))
            .col_expr(DesignCol::UpdatedAt, Expr::value(now))
            .filter(DesignCol::Id.is_in(design_ids))
            .filter(DesignCol::Status.is_in(DesignStatus::predecessors_of(
                DesignStatus::OrderCreated,
            )))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(order)
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Provider failures never undo a paid order; they only warn.
async fn forward_to_provider(state: &AppState, pending: &CheckoutSession) {
    let order = &pending.provider_order;
    let Some(printify) = state.printify.as_ref() else {
        tracing::warn!(reference = %pending.reference, "printify not configured; order not forwarded");
        return;
    };
    if order.line_items.is_empty() {
        return;
    }
    match printify.create_order(order).await {
        Ok(created) => tracing::info!(
            reference = %pending.reference,
            printify_order_id = %created.id,
            "order forwarded to printify"
        ),
        Err(err) => tracing::warn!(
            reference = %pending.reference,
            error = %err,
            "printify order creation failed; order remains paid locally"
        ),
    }
}

async fn finish_checkout(session: &Session) -> AppResult<()> {
    cart::clear(session).await?;
    checkout::clear(session).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirects_follow_outcome() {
        assert_eq!(CallbackOutcome::MissingReference.redirect_path(), "/api/checkout");
        assert_eq!(
            CallbackOutcome::Completed {
                reference: "R1".into(),
                order_id: Uuid::nil()
            }
            .redirect_path(),
            "/api/orders/success/R1"
        );
        assert_eq!(
            CallbackOutcome::AlreadyProcessed { reference: "R1".into() }.redirect_path(),
            "/api/orders/success/R1"
        );
        assert_eq!(
            CallbackOutcome::Failed {
                reference: "R2".into(),
                message: "Declined by bank".into()
            }
            .redirect_path(),
            "/api/orders/failure?message=Declined%20by%20bank"
        );
        assert!(
            CallbackOutcome::IntentLost { reference: "R3".into() }
                .redirect_path()
                .contains("R3")
        );
    }

    #[test]
    fn unique_violation_detection_ignores_other_errors() {
        assert!(!is_unique_violation(&DbErr::Custom("boom".into())));
    }
}

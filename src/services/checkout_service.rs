//! Turns the session cart into a Paystack transaction plus the pending
//! checkout session the callback later materializes into an order.

use std::collections::BTreeMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    clients::{
        paystack::InitializeTransaction,
        printify::{PlacedImage, PrintifyAddress, PrintifyLineItem, PrintifyOrderRequest},
    },
    dto::{
        cart::CartView,
        checkout::{CheckoutRequest, CheckoutSummary},
    },
    entity::{
        CustomDesigns, Orders, Products, Users, custom_designs, orders::Column as OrderCol,
        products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ProductOption, ProductVariant, product_options, product_variants},
    money::{round_money, to_minor_units},
    response::{ApiResponse, Meta},
    session::{
        cart::{self, Cart, CartLine},
        checkout::{self, CheckoutSession, OrderIntent},
        flash,
    },
    state::AppState,
};

pub const EMPTY_CART_NOTICE: &str = "Your cart is empty.";
const DEFAULT_COUNTRY: &str = "NG";
const REFERENCE_ATTEMPTS: usize = 5;
/// Printify's standard shipping.
const SHIPPING_METHOD: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Nothing to pay for; a notice is queued for the cart view.
    EmptyCart,
    Redirect {
        authorization_url: String,
        reference: String,
    },
}

/// Cart summary for the checkout page, or `None` when the cart is empty.
pub async fn checkout_summary(
    state: &AppState,
    session: &Session,
) -> AppResult<Option<ApiResponse<CheckoutSummary>>> {
    let cart = cart::load(session).await?;
    if cart.is_empty() {
        flash::push(session, EMPTY_CART_NOTICE).await?;
        return Ok(None);
    }

    let summary = CheckoutSummary {
        cart: CartView::from(&cart),
        currency: state.config.currency.clone(),
        paystack_public_key: state
            .payments
            .as_ref()
            .and_then(|gateway| gateway.public_key().map(str::to_string)),
    };
    Ok(Some(ApiResponse::success(
        "Checkout",
        summary,
        Some(Meta::empty()),
    )))
}

pub async fn begin_checkout(
    state: &AppState,
    session: &Session,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<CheckoutOutcome> {
    let cart = cart::load(session).await?;
    if cart.is_empty() {
        flash::push(session, EMPTY_CART_NOTICE).await?;
        return Ok(CheckoutOutcome::EmptyCart);
    }

    let total_amount = round_money(cart.total());
    let amount = to_minor_units(total_amount)
        .filter(|kobo| *kobo > 0)
        .ok_or_else(|| AppError::BadRequest("Order total is invalid.".into()))?;
    let gateway = state.payments()?;

    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let (first_name, last_name) = split_name(&payload.name, &account.first_name, &account.last_name);
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(&account.email)
        .to_string();
    let country = payload
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COUNTRY)
        .to_string();

    let intent = OrderIntent {
        first_name,
        last_name,
        email,
        phone: payload.phone,
        address: payload.address,
        city: payload.city,
        state: payload.state,
        zipcode: payload.zipcode,
        country,
        total_amount,
        cart,
        user_id: Some(user.user_id),
    };

    // Every line must map to a provider line item before money moves.
    let line_items = provider_line_items(state, &intent.cart).await?;
    let reference = new_reference(&state.orm).await?;
    let provider_order = PrintifyOrderRequest {
        external_id: reference.clone(),
        label: reference.clone(),
        line_items,
        shipping_method: SHIPPING_METHOD,
        send_shipping_notification: false,
        address_to: PrintifyAddress {
            first_name: intent.first_name.clone(),
            last_name: intent.last_name.clone(),
            email: intent.email.clone(),
            phone: intent.phone.clone(),
            country: intent.country.clone(),
            region: intent.state.clone(),
            address1: intent.address.clone(),
            city: intent.city.clone(),
            zip: intent.zipcode.clone(),
        },
    };

    let customer_name = format!("{} {}", intent.first_name, intent.last_name)
        .trim()
        .to_string();
    let request = InitializeTransaction {
        email: intent.email.clone(),
        amount,
        currency: state.config.currency.clone(),
        reference: reference.clone(),
        callback_url: format!(
            "{}/api/payments/callback",
            state.config.base_url.trim_end_matches('/')
        ),
        metadata: serde_json::json!({
            "customer_name": customer_name,
            "cart_id": session.id().map(|id| id.to_string()),
            "order_items_count": intent.cart.len(),
            "user_id": user.user_id,
        }),
    };

    let authorization = match gateway.initialize(&request).await {
        Ok(authorization) => authorization,
        Err(err) => {
            tracing::warn!(error = %err, %reference, "payment initialization failed");
            return Err(err.into());
        }
    };

    let ttl = chrono::Duration::minutes(state.config.checkout_ttl_minutes);
    checkout::store(
        session,
        &CheckoutSession::new(reference.clone(), intent, provider_order, ttl),
    )
    .await?;

    tracing::info!(%reference, amount, "checkout started");
    Ok(CheckoutOutcome::Redirect {
        authorization_url: authorization.authorization_url,
        reference,
    })
}

/// First word is the first name; the rest is the last name. Blank input falls
/// back to the account names.
fn split_name(name: &str, account_first: &str, account_last: &str) -> (String, String) {
    let mut words = name.split_whitespace();
    match words.next() {
        Some(first) => (first.to_string(), words.collect::<Vec<_>>().join(" ")),
        None => {
            let first = if account_first.is_empty() {
                "Customer"
            } else {
                account_first
            };
            (first.to_string(), account_last.to_string())
        }
    }
}

pub fn generate_reference() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("HOXOBIL-{}", hex[..10].to_uppercase())
}

async fn new_reference(orm: &DatabaseConnection) -> AppResult<String> {
    for _ in 0..REFERENCE_ATTEMPTS {
        let reference = generate_reference();
        let taken = Orders::find()
            .filter(OrderCol::PaymentReference.eq(reference.as_str()))
            .count(orm)
            .await?;
        if taken == 0 {
            return Ok(reference);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate an unused payment reference"
    )))
}

async fn provider_line_items(state: &AppState, cart: &Cart) -> AppResult<Vec<PrintifyLineItem>> {
    let mut items = Vec::with_capacity(cart.len());
    for (key, line) in cart.lines() {
        let item = match line.custom_design_id {
            Some(design_id) => custom_line_item(state, design_id, line).await?,
            None => catalog_line_item(key, line)?,
        };
        items.push(item);
    }
    Ok(items)
}

fn catalog_line_item(key: &str, line: &CartLine) -> AppResult<PrintifyLineItem> {
    let variant_id = line
        .variant_id
        .as_deref()
        .and_then(|id| id.parse::<i64>().ok())
        .ok_or_else(|| {
            AppError::BadRequest(format!("Cart item {key} has no valid variant selected."))
        })?;
    Ok(PrintifyLineItem::Catalog {
        product_id: line.base_item_id.clone(),
        variant_id,
        quantity: line.quantity,
    })
}

async fn custom_line_item(
    state: &AppState,
    design_id: Uuid,
    line: &CartLine,
) -> AppResult<PrintifyLineItem> {
    let (design, product) = CustomDesigns::find_by_id(design_id)
        .find_also_related(Products)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Custom design {design_id} no longer exists.")))?;
    let product = product.ok_or(AppError::NotFound)?;
    if !design.status.is_orderable() {
        return Err(AppError::BadRequest(format!(
            "Custom design {design_id} has already been ordered. Remove it from your cart."
        )));
    }

    let unmatched = || {
        AppError::BadRequest(format!(
            "No {} variant matches size '{}' and color '{}'.",
            product.title, design.selected_size, design.selected_color
        ))
    };
    let variant = design_variant(&product, &design).ok_or_else(unmatched)?;
    let variant_id = variant.id.parse::<i64>().map_err(|_| unmatched())?;

    let (Some(blueprint_id), Some(print_provider_id)) = (
        product.printify_blueprint_id,
        product.printify_print_provider_id,
    ) else {
        return Err(AppError::BadRequest(format!(
            "{} is missing its print blueprint.",
            product.title
        )));
    };

    let src = design.printify_image_url.clone().unwrap_or_else(|| {
        format!(
            "{}/media/{}",
            state.config.base_url.trim_end_matches('/'),
            design.design_image_path
        )
    });
    let mut print_areas = BTreeMap::new();
    print_areas.insert("front".to_string(), vec![PlacedImage::centered(src)]);

    Ok(PrintifyLineItem::Custom {
        blueprint_id,
        print_provider_id,
        variant_id,
        quantity: line.quantity,
        print_areas,
    })
}

/// The catalog variant matching a design's chosen size and color.
pub fn design_variant(
    product: &products::Model,
    design: &custom_designs::Model,
) -> Option<ProductVariant> {
    let options = product_options(product);
    let variants = product_variants(product);
    resolve_variant(
        &options,
        &variants,
        &design.selected_size,
        &design.selected_color,
    )
    .cloned()
}

/// Matches by option-value ids first, then by the `Color / Size` tokens of the
/// variant title. Disabled variants never match.
pub fn resolve_variant<'a>(
    options: &[ProductOption],
    variants: &'a [ProductVariant],
    size: &str,
    color: &str,
) -> Option<&'a ProductVariant> {
    let size = size.trim();
    let color = color.trim();
    if size.is_empty() && color.is_empty() {
        return None;
    }

    let size_id = option_value_id(options, "size", size);
    let color_id = option_value_id(options, "color", color);
    let wanted: Vec<&str> = [(size, size_id), (color, color_id)]
        .into_iter()
        .filter(|(selected, _)| !selected.is_empty())
        .map(|(_, id)| id)
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();

    let enabled = || variants.iter().filter(|variant| variant.is_enabled);

    if !wanted.is_empty() {
        if let Some(variant) = enabled().find(|variant| {
            wanted
                .iter()
                .all(|id| variant.option_value_ids.iter().any(|v| v == id))
        }) {
            return Some(variant);
        }
    }

    enabled().find(|variant| {
        let tokens: Vec<String> = variant
            .title
            .split('/')
            .map(|token| token.trim().to_lowercase())
            .collect();
        [size, color]
            .iter()
            .filter(|selected| !selected.is_empty())
            .all(|selected| tokens.contains(&selected.to_lowercase()))
    })
}

fn option_value_id<'a>(options: &'a [ProductOption], axis: &str, title: &str) -> Option<&'a str> {
    if title.is_empty() {
        return None;
    }
    options
        .iter()
        .filter(|option| {
            option.kind.eq_ignore_ascii_case(axis) || option.name.to_lowercase().contains(axis)
        })
        .flat_map(|option| option.values.iter())
        .find(|value| value.title.eq_ignore_ascii_case(title))
        .map(|value| value.id.as_str())
}

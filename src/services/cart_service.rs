use tower_sessions::Session;

use crate::{
    dto::cart::{AddToCartRequest, CartView, UpdateCartRequest},
    error::{AppError, AppResult},
    models::product_variants,
    response::{ApiResponse, Meta},
    services::product_service::find_by_printify_id,
    session::{
        cart::{self, CartLine, line_key},
        flash,
    },
    state::AppState,
};

pub(crate) fn quantity_from(raw: i64) -> AppResult<u32> {
    if raw <= 0 {
        return Err(AppError::BadRequest("Quantity must be positive.".into()));
    }
    u32::try_from(raw).map_err(|_| AppError::BadRequest("Quantity is too large.".into()))
}

pub async fn view_cart(session: &Session) -> AppResult<ApiResponse<CartView>> {
    let cart = cart::load(session).await?;
    let notices = flash::take(session).await?;
    Ok(ApiResponse::success("Cart", CartView::from(&cart), Some(Meta::empty())).with_notices(notices))
}

pub async fn add_to_cart(
    state: &AppState,
    session: &Session,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = quantity_from(payload.quantity.unwrap_or(1))?;
    let variant_id = payload.variant_id.as_deref().filter(|v| !v.is_empty());
    let key = line_key(&payload.product_id, variant_id);
    let mut cart = cart::load(session).await?;

    let message = if let Some(line) = cart.get_mut(&key) {
        line.quantity = line.quantity.saturating_add(quantity);
        format!("Added another {}.", line.display_title())
    } else {
        let variant_id =
            variant_id.ok_or_else(|| AppError::BadRequest("Please select a variant.".into()))?;
        let product = find_by_printify_id(&state.orm, &payload.product_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let variant = product_variants(&product)
            .into_iter()
            .find(|variant| variant.id == variant_id)
            .ok_or_else(|| AppError::BadRequest("Variant not found.".into()))?;
        if !variant.is_enabled || !variant.is_available {
            return Err(AppError::BadRequest("Variant is not available.".into()));
        }

        let message = format!("Added {} ({}) to cart.", product.title, variant.title);
        cart.insert(
            key,
            CartLine {
                base_item_id: product.printify_id,
                variant_id: Some(variant.id),
                custom_design_id: None,
                title: product.title,
                variant_title: Some(variant.title),
                unit_price: variant.price_ngn,
                quantity,
                image_url: product.primary_image_url,
                is_custom: false,
            },
        );
        message
    };

    cart::save(session, &cart).await?;
    Ok(ApiResponse::success(message, CartView::from(&cart), Some(Meta::empty())))
}

pub async fn update_cart_line(
    session: &Session,
    key: &str,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity == 0 {
        return remove_from_cart(session, key).await;
    }
    let quantity = quantity_from(payload.quantity)?;
    let mut cart = cart::load(session).await?;
    let line = cart.get_mut(key).ok_or(AppError::NotFound)?;
    line.quantity = quantity;
    let message = format!("Updated {}.", line.display_title());

    cart::save(session, &cart).await?;
    Ok(ApiResponse::success(message, CartView::from(&cart), Some(Meta::empty())))
}

pub async fn remove_from_cart(session: &Session, key: &str) -> AppResult<ApiResponse<CartView>> {
    let mut cart = cart::load(session).await?;
    let line = cart.remove(key).ok_or(AppError::NotFound)?;
    cart::save(session, &cart).await?;
    Ok(ApiResponse::success(
        format!("Removed {} from cart.", line.display_title()),
        CartView::from(&cart),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn tee() -> CartLine {
        CartLine {
            base_item_id: "A".into(),
            variant_id: Some("1".into()),
            custom_design_id: None,
            title: "Tee".into(),
            variant_title: Some("Black / L".into()),
            unit_price: Decimal::new(5000, 0),
            quantity: 1,
            image_url: None,
            is_custom: false,
        }
    }

    #[test]
    fn quantities_must_be_positive() {
        assert!(quantity_from(0).is_err());
        assert!(quantity_from(-3).is_err());
        assert_eq!(quantity_from(2).unwrap(), 2);
    }

    #[tokio::test]
    async fn update_to_zero_removes_the_line() {
        let session = session();
        let mut current = cart::load(&session).await.unwrap();
        current.insert("A-1".into(), tee());
        cart::save(&session, &current).await.unwrap();

        let updated = update_cart_line(&session, "A-1", UpdateCartRequest { quantity: 3 })
            .await
            .unwrap();
        assert_eq!(updated.data.unwrap().item_count, 3);

        update_cart_line(&session, "A-1", UpdateCartRequest { quantity: 0 })
            .await
            .unwrap();
        assert!(cart::load(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_unknown_key_is_not_found() {
        let session = session();
        let err = remove_from_cart(&session, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn view_drains_flash_notices() {
        let session = session();
        flash::push(&session, "Your cart is empty.").await.unwrap();

        let first = view_cart(&session).await.unwrap();
        assert_eq!(first.notices, vec!["Your cart is empty.".to_string()]);
        let second = view_cart(&session).await.unwrap();
        assert!(second.notices.is_empty());
    }
}

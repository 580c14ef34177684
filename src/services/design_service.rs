//! Customer-made designs: store the rendered PNG, hand it to Printify, and
//! put the design in the cart as its own line.

use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Datelike, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm::sea_query::Expr;
use tokio::fs;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    clients::printify::strip_data_url_prefix,
    dto::{
        cart::CartView,
        designs::{AddDesignToCartRequest, SubmitDesignRequest},
    },
    entity::{
        CustomDesigns, Products,
        custom_designs::{ActiveModel as DesignActive, Column as DesignCol, DesignStatus, Model as DesignModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CustomDesign,
    response::{ApiResponse, Meta},
    services::{cart_service::quantity_from, checkout_service::design_variant},
    session::cart::{self, CartLine, design_key},
    state::AppState,
};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const DESIGN_DIR: &str = "custom_designs";

pub fn decode_png(image: &str) -> AppResult<Vec<u8>> {
    let bytes = STANDARD
        .decode(strip_data_url_prefix(image.trim()))
        .map_err(|_| AppError::BadRequest("Design image is not valid base64.".into()))?;
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err(AppError::BadRequest("Design image must be a PNG.".into()));
    }
    Ok(bytes)
}

/// `custom_designs/YYYY/MM/DD/{id}.png`, relative to the media root.
pub fn design_image_path(id: Uuid, now: chrono::DateTime<Utc>) -> PathBuf {
    Path::new(DESIGN_DIR)
        .join(format!("{:04}", now.year()))
        .join(format!("{:02}", now.month()))
        .join(format!("{:02}", now.day()))
        .join(format!("{id}.png"))
}

pub async fn submit_design(
    state: &AppState,
    user: &AuthUser,
    payload: SubmitDesignRequest,
) -> AppResult<ApiResponse<CustomDesign>> {
    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let bytes = decode_png(&payload.image)?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    let relative = design_image_path(id, now);
    let absolute = Path::new(&state.config.media_root).join(&relative);
    if let Some(dir) = absolute.parent() {
        fs::create_dir_all(dir).await.map_err(anyhow::Error::from)?;
    }
    fs::write(&absolute, &bytes)
        .await
        .map_err(anyhow::Error::from)?;
    tracing::debug!(path = %absolute.display(), "design image stored");

    let design = DesignActive {
        id: Set(id),
        user_id: Set(Some(user.user_id)),
        product_id: Set(product.id),
        design_image_path: Set(relative.to_string_lossy().replace('\\', "/")),
        design_json: Set(payload.design_json),
        selected_product_type: Set(payload.product_type),
        selected_size: Set(payload.size),
        selected_color: Set(payload.color),
        printify_image_id: Set(None),
        printify_image_url: Set(None),
        printify_product_id: Set(None),
        status: Set(DesignStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    let design = upload_to_printify(state, design, &payload.image).await?;
    Ok(ApiResponse::success(
        "Design saved",
        CustomDesign::from(design),
        Some(Meta::empty()),
    ))
}

/// Upload failures leave the design pending.
async fn upload_to_printify(
    state: &AppState,
    design: DesignModel,
    image: &str,
) -> AppResult<DesignModel> {
    let Some(printify) = state.printify.as_ref() else {
        tracing::warn!(design_id = %design.id, "printify not configured; design left pending");
        return Ok(design);
    };
    let file_name = format!("{}.png", design.id);
    let uploaded = match printify.upload_image(&file_name, image).await {
        Ok(uploaded) => uploaded,
        Err(err) => {
            tracing::warn!(design_id = %design.id, error = %err, "design upload to printify failed");
            return Ok(design);
        }
    };

    if !design.status.can_advance_to(DesignStatus::UploadedToPrintify) {
        return Ok(design);
    }
    let mut active: DesignActive = design.into();
    active.printify_image_id = Set(Some(uploaded.id));
    active.printify_image_url = Set(uploaded.preview_url);
    active.status = Set(DesignStatus::UploadedToPrintify);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(&state.orm).await?)
}

pub async fn add_design_to_cart(
    state: &AppState,
    session: &Session,
    user: &AuthUser,
    design_id: Uuid,
    payload: AddDesignToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = quantity_from(payload.quantity.unwrap_or(1))?;
    let (design, product) = CustomDesigns::find_by_id(design_id)
        .find_also_related(Products)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if design.user_id != Some(user.user_id) {
        return Err(AppError::Forbidden);
    }
    let product = product.ok_or(AppError::NotFound)?;
    if !design.status.is_orderable() {
        return Err(AppError::BadRequest(
            "This design can no longer be added to the cart.".into(),
        ));
    }

    let variant = design_variant(&product, &design);
    let unit_price = variant
        .as_ref()
        .map_or(product.base_price, |variant| variant.price_ngn);
    let variant_title = variant.as_ref().map(|v| v.title.clone()).or_else(|| {
        let label = [design.selected_color.as_str(), design.selected_size.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" / ");
        (!label.is_empty()).then_some(label)
    });
    let image_url = design.printify_image_url.clone().or_else(|| {
        Some(format!(
            "{}/media/{}",
            state.config.base_url.trim_end_matches('/'),
            design.design_image_path
        ))
    });

    let key = design_key(design.id);
    let mut cart = cart::load(session).await?;
    if let Some(line) = cart.get_mut(&key) {
        line.quantity = line.quantity.saturating_add(quantity);
    } else {
        cart.insert(
            key,
            CartLine {
                base_item_id: product.printify_id.clone(),
                variant_id: variant.map(|v| v.id),
                custom_design_id: Some(design.id),
                title: format!("Custom {}", product.title),
                variant_title,
                unit_price,
                quantity,
                image_url,
                is_custom: true,
            },
        );
    }
    cart::save(session, &cart).await?;

    CustomDesigns::update_many()
        .col_expr(DesignCol::Status, Expr::value(DesignStatus::AddedToCart))
        .col_expr(DesignCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(DesignCol::Id.eq(design.id))
        .filter(DesignCol::Status.is_in(DesignStatus::predecessors_of(DesignStatus::AddedToCart)))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        format!("Added custom {} to cart.", product.title),
        CartView::from(&cart),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn png_payloads_only() {
        let png = STANDARD.encode(b"\x89PNG\r\n\x1a\nrest-of-file");
        assert!(decode_png(&format!("data:image/png;base64,{png}")).is_ok());
        assert!(decode_png(&png).is_ok());

        let jpeg = STANDARD.encode(b"\xff\xd8\xff\xe0JFIF");
        assert!(matches!(decode_png(&jpeg), Err(AppError::BadRequest(_))));
        assert!(matches!(decode_png("%%%"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn images_are_filed_by_date() {
        let id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            design_image_path(id, at),
            PathBuf::from(format!("custom_designs/2025/03/07/{id}.png"))
        );
    }
}

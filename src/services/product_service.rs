use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    clients::printify::{PrintifyProduct, PrintifyVariant},
    dto::products::{Catalog, CatalogQuery, CategoryGroup, SyncReport},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductVariant},
    money::convert_usd_cents,
    response::{ApiResponse, Meta},
    state::AppState,
};

const SYNC_PAGE_SIZE: u32 = 100;

/// Display order of catalog sections.
pub const CATEGORIES: [&str; 7] = [
    "Hoodies & Sweatshirts",
    "T-Shirts",
    "Joggers & Sweatpants",
    "Tank Tops",
    "Mugs",
    "Posters & Wall Art",
    "Other",
];

pub fn infer_category(title: &str) -> &'static str {
    let title = title.to_lowercase();
    if title.contains("hoodie") || title.contains("hooded sweatshirt") {
        CATEGORIES[0]
    } else if title.contains("t-shirt") || title.contains("tee") {
        CATEGORIES[1]
    } else if title.contains("jogger") || title.contains("sweatpants") {
        CATEGORIES[2]
    } else if title.contains("tank top") {
        CATEGORIES[3]
    } else if title.contains("mug") {
        CATEGORIES[4]
    } else if title.contains("poster") {
        CATEGORIES[5]
    } else {
        CATEGORIES[6]
    }
}

pub fn variant_from_printify(variant: &PrintifyVariant, rate: Decimal) -> ProductVariant {
    ProductVariant {
        id: variant.id.clone(),
        title: variant.title.clone(),
        price_cents: variant.price,
        price_ngn: convert_usd_cents(variant.price, rate),
        sku: variant.sku.clone(),
        is_available: variant.is_available,
        is_enabled: variant.is_enabled,
        option_value_ids: variant.options.iter().map(i64::to_string).collect(),
    }
}

/// Pulls every product from the print provider and upserts it by provider id.
pub async fn sync_products(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SyncReport>> {
    ensure_admin(user)?;
    let printify = state.printify()?;
    let shop_id = printify.shop_id().to_string();
    let rate = state.config.usd_to_ngn_rate;

    let mut report = SyncReport::default();
    let mut page_number = 1;
    loop {
        let page = printify.list_products(page_number, SYNC_PAGE_SIZE).await?;
        report.pages += 1;
        for product in &page.data {
            if upsert_product(&state.orm, product, &shop_id, rate).await? {
                report.created += 1;
            } else {
                report.updated += 1;
            }
        }
        if page.is_last() {
            break;
        }
        page_number += 1;
    }

    tracing::info!(
        created = report.created,
        updated = report.updated,
        pages = report.pages,
        "catalog sync finished"
    );
    log_audit_best_effort(
        &state.pool,
        Some(user.user_id),
        "catalog_sync",
        Some("products"),
        Some(serde_json::json!({ "created": report.created, "updated": report.updated })),
    )
    .await;

    Ok(ApiResponse::success("Products synced", report, Some(Meta::empty())))
}

/// Inserts or refreshes one product row; returns `true` when it was created.
pub async fn upsert_product(
    orm: &DatabaseConnection,
    product: &PrintifyProduct,
    shop_id: &str,
    rate: Decimal,
) -> AppResult<bool> {
    let variants: Vec<ProductVariant> = product
        .variants
        .iter()
        .map(|variant| variant_from_printify(variant, rate))
        .collect();
    let base_price = variants
        .first()
        .map(|variant| variant.price_ngn)
        .unwrap_or_default();
    let variants_json = serde_json::to_value(&variants).map_err(anyhow::Error::from)?;
    let now = Utc::now();

    let existing = find_by_printify_id(orm, &product.id).await?;
    let created = existing.is_none();
    let mut active = match existing {
        Some(model) => model.into_active_model(),
        None => ActiveModel {
            id: Set(Uuid::new_v4()),
            printify_id: Set(product.id.clone()),
            created_at: Set(now.into()),
            ..Default::default()
        },
    };

    active.title = Set(product.title.clone());
    active.description = Set(product.description.clone());
    active.base_price = Set(base_price);
    active.primary_image_url = Set(product.images.first().map(|image| image.src.clone()));
    active.product_options_data = Set(serde_json::Value::Array(product.options.clone()));
    active.variants_data = Set(variants_json);
    active.tags = Set(serde_json::json!(product.tags));
    active.printify_shop_id = Set(Some(shop_id.to_string()));
    active.printify_blueprint_id = Set(product.blueprint_id);
    active.printify_print_provider_id = Set(product.print_provider_id);
    active.is_published = Set(product.visible);
    active.last_synced_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());

    if created {
        active.insert(orm).await?;
    } else {
        active.update(orm).await?;
    }
    tracing::debug!(printify_id = %product.id, created, "product upserted");
    Ok(created)
}

pub async fn find_by_printify_id(
    orm: &DatabaseConnection,
    printify_id: &str,
) -> AppResult<Option<ProductModel>> {
    Ok(Products::find()
        .filter(Column::PrintifyId.eq(printify_id))
        .one(orm)
        .await?)
}

/// Published products grouped into catalog sections.
pub async fn list_products(
    state: &AppState,
    query: CatalogQuery,
) -> AppResult<ApiResponse<Catalog>> {
    let mut condition = Condition::all().add(Column::IsPublished.eq(true));
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let products: Vec<Product> = Products::find()
        .filter(condition)
        .order_by_asc(Column::Title)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let wanted = query.category.as_deref().filter(|c| !c.is_empty());
    let categories = group_by_category(products, wanted);
    let total = categories.iter().map(|group| group.products.len()).sum();

    Ok(ApiResponse::success(
        "Products",
        Catalog { categories, total },
        Some(Meta::new(1, total as i64, total as i64)),
    ))
}

fn group_by_category(products: Vec<Product>, only: Option<&str>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = CATEGORIES
        .iter()
        .filter(|name| only.is_none_or(|wanted| wanted.eq_ignore_ascii_case(name)))
        .map(|name| CategoryGroup {
            category: name.to_string(),
            products: Vec::new(),
        })
        .collect();

    for product in products {
        if let Some(group) = groups.iter_mut().find(|g| g.category == product.category) {
            group.products.push(product);
        }
    }
    groups.retain(|group| !group.products.is_empty());
    groups
}

pub async fn get_product(state: &AppState, printify_id: &str) -> AppResult<ApiResponse<Product>> {
    let product = find_by_printify_id(&state.orm, printify_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Product",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn categories_from_titles() {
        assert_eq!(infer_category("Unisex Heavy Blend Hooded Sweatshirt"), "Hoodies & Sweatshirts");
        assert_eq!(infer_category("HOXOBIL Hoodie"), "Hoodies & Sweatshirts");
        assert_eq!(infer_category("Classic Tee"), "T-Shirts");
        assert_eq!(infer_category("Fleece Joggers"), "Joggers & Sweatpants");
        assert_eq!(infer_category("Ribbed Tank Top"), "Tank Tops");
        assert_eq!(infer_category("Ceramic Mug 11oz"), "Mugs");
        assert_eq!(infer_category("Matte Poster"), "Posters & Wall Art");
        assert_eq!(infer_category("Phone Case"), "Other");
    }

    #[test]
    fn variants_carry_converted_price_and_option_ids() {
        let variant = PrintifyVariant {
            id: "101".into(),
            title: "Black / L".into(),
            price: 2000,
            sku: Some("SKU-1".into()),
            is_available: true,
            is_enabled: true,
            options: vec![7, 12],
        };
        let converted = variant_from_printify(&variant, Decimal::from_str("1607.00").unwrap());
        assert_eq!(converted.price_ngn, Decimal::from_str("32140.00").unwrap());
        assert_eq!(converted.option_value_ids, vec!["7".to_string(), "12".to_string()]);
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    custom_designs, custom_designs::DesignStatus, order_items, orders, products, user_profiles,
    users,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub referral_code: Option<String>,
    pub referred_by: Option<Uuid>,
    pub referral_count: i32,
    pub unlocked_first_digit: Option<String>,
    pub digit_unlocked_at: Option<DateTime<Utc>>,
}

impl From<user_profiles::Model> for UserProfile {
    fn from(model: user_profiles::Model) -> Self {
        Self {
            user_id: model.user_id,
            referral_code: model.referral_code,
            referred_by: model.referred_by,
            referral_count: model.referral_count,
            unlocked_first_digit: model.unlocked_first_digit,
            digit_unlocked_at: model.digit_unlocked_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// One purchasable variant of a synced product, as stored in `variants_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub price_cents: i64,
    pub price_ngn: Decimal,
    pub sku: Option<String>,
    pub is_available: bool,
    pub is_enabled: bool,
    #[serde(default)]
    pub option_value_ids: Vec<String>,
}

/// One option axis (e.g. Colors, Sizes) as stored in `product_options_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductOption {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub values: Vec<ProductOptionValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductOptionValue {
    #[serde(deserialize_with = "crate::clients::printify::id_as_string")]
    pub id: String,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub printify_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub base_price: Decimal,
    pub primary_image_url: Option<String>,
    pub options: Vec<ProductOption>,
    pub variants: Vec<ProductVariant>,
    pub tags: Vec<String>,
    pub is_published: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            category: crate::services::product_service::infer_category(&model.title).to_string(),
            options: product_options(&model),
            variants: product_variants(&model),
            tags: serde_json::from_value(model.tags).unwrap_or_default(),
            id: model.id,
            printify_id: model.printify_id,
            title: model.title,
            description: model.description,
            base_price: model.base_price,
            primary_image_url: model.primary_image_url,
            is_published: model.is_published,
            last_synced_at: model.last_synced_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Variants stored on a product row; malformed JSON reads as no variants.
pub fn product_variants(model: &products::Model) -> Vec<ProductVariant> {
    serde_json::from_value(model.variants_data.clone()).unwrap_or_default()
}

pub fn product_options(model: &products::Model) -> Vec<ProductOption> {
    serde_json::from_value(model.product_options_data.clone()).unwrap_or_default()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomDesign {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub product_id: Uuid,
    pub design_image_path: String,
    pub selected_product_type: String,
    pub selected_size: String,
    pub selected_color: String,
    pub printify_image_id: Option<String>,
    pub status: DesignStatus,
    pub created_at: DateTime<Utc>,
}

impl From<custom_designs::Model> for CustomDesign {
    fn from(model: custom_designs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            design_image_path: model.design_image_path,
            selected_product_type: model.selected_product_type,
            selected_size: model.selected_size,
            selected_color: model.selected_color,
            printify_image_id: model.printify_image_id,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
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
    pub paid: bool,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            address: model.address,
            city: model.city,
            state: model.state,
            zipcode: model.zipcode,
            country: model.country,
            total_amount: model.total_amount,
            paid: model.paid,
            payment_reference: model.payment_reference,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub custom_design_id: Option<Uuid>,
    pub product_title: String,
    pub variant_title: Option<String>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub line_total: Decimal,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            line_total: model.price_at_purchase * Decimal::from(model.quantity),
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            custom_design_id: model.custom_design_id,
            product_title: model.product_title,
            variant_title: model.variant_title,
            quantity: model.quantity,
            price_at_purchase: model.price_at_purchase,
        }
    }
}

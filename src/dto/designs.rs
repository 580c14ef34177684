use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitDesignRequest {
    pub product_id: Uuid,
    /// PNG as base64, optionally as a `data:image/png;base64,` URL.
    pub image: String,
    #[schema(value_type = Option<Object>)]
    pub design_json: Option<serde_json::Value>,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddDesignToCartRequest {
    pub quantity: Option<i64>,
}

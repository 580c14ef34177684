use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::Product;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryGroup {
    pub category: String,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Catalog {
    pub categories: Vec<CategoryGroup>,
    pub total: usize,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct SyncReport {
    pub created: u32,
    pub updated: u32,
    pub pages: u32,
}

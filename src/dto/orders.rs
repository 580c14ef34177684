use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Order, OrderItem};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FailureQuery {
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderFailure {
    pub message: String,
}

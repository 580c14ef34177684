use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use tower_sessions::Session;

use crate::{
    dto::orders::{OrderFailure, OrderList, OrderWithItems},
    entity::{
        OrderItems, Orders, order_items::Column as OrderItemCol, orders::Column as OrderCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, MaybeUser},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    session::{checkout, flash},
    state::AppState,
};

pub const DEFAULT_FAILURE_MESSAGE: &str = "Your payment could not be processed.";

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// The paid order behind a payment reference. Orders owned by someone else
/// read as not found unless the caller is an admin.
pub async fn order_success(
    state: &AppState,
    session: &Session,
    viewer: &MaybeUser,
    reference: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::PaymentReference.eq(reference))
                .add(OrderCol::Paid.eq(true)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(owner) = order.user_id {
        let allowed = viewer
            .0
            .as_ref()
            .is_some_and(|user| user.user_id == owner || user.is_admin());
        if !allowed {
            return Err(AppError::NotFound);
        }
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    checkout::clear(session).await?;
    let notices = flash::take(session).await?;

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    )
    .with_notices(notices))
}

pub async fn order_failure(
    session: &Session,
    message: Option<String>,
) -> AppResult<ApiResponse<OrderFailure>> {
    let message = message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
    let notices = flash::take(session).await?;
    Ok(ApiResponse::success(
        "Payment failed",
        OrderFailure { message },
        Some(Meta::empty()),
    )
    .with_notices(notices))
}

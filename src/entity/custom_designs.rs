use sea_orm::{Iterable, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Processing state of a custom design. Variants are declared in lifecycle
/// order; `fulfilled` and `failed` are terminal.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "snake_case")]
pub enum DesignStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "uploaded_to_printify")]
    UploadedToPrintify,
    #[sea_orm(string_value = "printify_product_ready")]
    PrintifyProductReady,
    #[sea_orm(string_value = "added_to_cart")]
    AddedToCart,
    #[sea_orm(string_value = "order_created")]
    OrderCreated,
    #[sea_orm(string_value = "fulfilled")]
    Fulfilled,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl DesignStatus {
    fn rank(self) -> u8 {
        match self {
            DesignStatus::Pending => 0,
            DesignStatus::UploadedToPrintify => 1,
            DesignStatus::PrintifyProductReady => 2,
            DesignStatus::AddedToCart => 3,
            DesignStatus::OrderCreated => 4,
            DesignStatus::Fulfilled => 5,
            DesignStatus::Failed => 6,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DesignStatus::Fulfilled | DesignStatus::Failed)
    }

    /// Whether moving from `self` to `next` keeps the status monotonic.
    pub fn can_advance_to(self, next: DesignStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == DesignStatus::Failed || next.rank() > self.rank()
    }

    /// Still eligible to sit in a cart and be paid for.
    pub fn is_orderable(self) -> bool {
        self == DesignStatus::AddedToCart || self.can_advance_to(DesignStatus::AddedToCart)
    }

    /// Every status from which `next` is a legal move.
    pub fn predecessors_of(next: DesignStatus) -> Vec<DesignStatus> {
        DesignStatus::iter()
            .filter(|status| status.can_advance_to(next))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "custom_designs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub product_id: Uuid,
    pub design_image_path: String,
    pub design_json: Option<Json>,
    pub selected_product_type: String,
    pub selected_size: String,
    pub selected_color: String,
    pub printify_image_id: Option<String>,
    pub printify_image_url: Option<String>,
    pub printify_product_id: Option<String>,
    pub status: DesignStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "SetNull"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_delete = "Cascade"
    )]
    Products,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::DesignStatus;

    #[test]
    fn status_only_moves_forward() {
        assert!(DesignStatus::Pending.can_advance_to(DesignStatus::UploadedToPrintify));
        assert!(DesignStatus::UploadedToPrintify.can_advance_to(DesignStatus::AddedToCart));
        assert!(DesignStatus::AddedToCart.can_advance_to(DesignStatus::OrderCreated));
        assert!(!DesignStatus::OrderCreated.can_advance_to(DesignStatus::AddedToCart));
        assert!(!DesignStatus::AddedToCart.can_advance_to(DesignStatus::AddedToCart));
    }

    #[test]
    fn terminal_statuses_are_final() {
        assert!(!DesignStatus::Fulfilled.can_advance_to(DesignStatus::Failed));
        assert!(!DesignStatus::Failed.can_advance_to(DesignStatus::Pending));
        assert!(DesignStatus::OrderCreated.can_advance_to(DesignStatus::Failed));
    }

    #[test]
    fn ordered_designs_cannot_be_paid_for_again() {
        assert!(DesignStatus::Pending.is_orderable());
        assert!(DesignStatus::AddedToCart.is_orderable());
        assert!(!DesignStatus::OrderCreated.is_orderable());
        assert!(!DesignStatus::Fulfilled.is_orderable());
        assert!(!DesignStatus::Failed.is_orderable());
    }

    #[test]
    fn predecessors_of_order_created() {
        let before = DesignStatus::predecessors_of(DesignStatus::OrderCreated);
        assert_eq!(
            before,
            vec![
                DesignStatus::Pending,
                DesignStatus::UploadedToPrintify,
                DesignStatus::PrintifyProductReady,
                DesignStatus::AddedToCart,
            ]
        );
    }
}

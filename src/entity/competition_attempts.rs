use sea_orm::entity::prelude::*;

/// Append-only log of every submitted competition code.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "competition_attempts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_key: Option<String>,
    pub ip_address: Option<String>,
    pub submitted_code: String,
    pub is_winner: bool,
    pub winning_code_id: Option<Uuid>,
    pub attempted_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::winning_codes::Entity",
        from = "Column::WinningCodeId",
        to = "super::winning_codes::Column::Id",
        on_delete = "SetNull"
    )]
    WinningCodes,
}

impl Related<super::winning_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WinningCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

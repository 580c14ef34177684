use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub referral_code: Option<String>,
    pub referred_by: Option<Uuid>,
    pub referral_count: i32,
    pub unlocked_first_digit: Option<String>,
    pub unlocked_digit_from_code: Option<Uuid>,
    pub digit_unlocked_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::winning_codes::Entity",
        from = "Column::UnlockedDigitFromCode",
        to = "super::winning_codes::Column::Id",
        on_delete = "SetNull"
    )]
    WinningCodes,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::winning_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WinningCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_date: DateTimeWithTimeZone,
    pub required_date: Option<DateTimeWithTimeZone>,
    pub shipped_date: Option<DateTimeWithTimeZone>,
    pub paid_date: Option<DateTimeWithTimeZone>,
    pub status: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub sum: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_details::Entity")]
    OrderDetails,
}

impl Related<super::order_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

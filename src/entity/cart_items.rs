use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Index, IndexCreateStatement};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_item_id: Uuid,
    pub quantity: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub customization: Json,
    /// Bumped on every quantity change.
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profiles::Entity",
        from = "Column::UserId",
        to = "super::profiles::Column::Id"
    )]
    Profiles,
    #[sea_orm(
        belongs_to = "super::food_items::Entity",
        from = "Column::FoodItemId",
        to = "super::food_items::Column::Id"
    )]
    FoodItems,
}

impl Related<super::profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profiles.def()
    }
}

impl Related<super::food_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FoodItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// One line per (user, food item). The add-to-cart upsert targets this key;
/// the Postgres migration declares the same constraint.
pub fn user_item_unique_index() -> IndexCreateStatement {
    Index::create()
        .name("cart_items_user_id_food_item_id_key")
        .table(Entity)
        .col(Column::UserId)
        .col(Column::FoodItemId)
        .unique()
        .to_owned()
}

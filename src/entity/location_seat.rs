//! A user-submitted point on the map.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A bench, gazebo or any other public seating place.
///
/// `cord_x` is the latitude and `cord_y` the longitude; the table carries
/// range checks for both.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "location_seats")]
#[serde(default)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub address: String,
    pub type_id: i32,
    pub status_id: i32,
    #[sea_orm(column_type = "Decimal(Some((20, 15)))")]
    pub cord_x: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 15)))")]
    pub cord_y: Decimal,
    pub author_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seat_type::Entity",
        from = "Column::TypeId",
        to = "super::seat_type::Column::Id"
    )]
    SeatType,
    #[sea_orm(
        belongs_to = "super::status::Entity",
        from = "Column::StatusId",
        to = "super::status::Column::Id"
    )]
    Status,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,
}

impl Related<super::seat_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatType.def()
    }
}

impl Related<super::status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Status.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

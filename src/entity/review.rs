use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// A rating of a place plus the attributes the reviewer observed.
///
/// Reviews attach to locations through [`super::location_review`].
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
#[serde(default)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub rate: i64,
    pub author_id: i32,
    pub created_at: DateTimeUtc,
    pub pollution_id: i32,
    pub condition_id: i32,
    pub material_id: i32,
    pub seating_positions: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,
    #[sea_orm(
        belongs_to = "super::pollution::Entity",
        from = "Column::PollutionId",
        to = "super::pollution::Column::Id"
    )]
    Pollution,
    #[sea_orm(
        belongs_to = "super::condition::Entity",
        from = "Column::ConditionId",
        to = "super::condition::Column::Id"
    )]
    Condition,
    #[sea_orm(
        belongs_to = "super::material::Entity",
        from = "Column::MaterialId",
        to = "super::material::Column::Id"
    )]
    Material,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::location_review::Entity> for Entity {
    fn to() -> RelationDef {
        super::location_review::Relation::Review.def().rev()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Stamps `created_at` on insert when the caller left it unset.
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(chrono::Utc::now());
        }
        Ok(self)
    }
}

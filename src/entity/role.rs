use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role id reserved for administrators.
pub const ADMIN_ROLE_ID: i32 = 1;

/// Role id used for new accounts when no role named [`USER_ROLE_NAME`] exists.
pub const DEFAULT_USER_ROLE_ID: i32 = 2;

pub const ADMIN_ROLE_NAME: &str = "admin";
pub const USER_ROLE_NAME: &str = "user";

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
#[serde(default)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub role_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Session records for the admin console.
//!
//! Rows are written and read by [`crate::SeaOrmStore`]; nothing else touches
//! this table.

use sea_orm::entity::prelude::*;

/// A stored admin console session.
///
/// | Column      | Type               | Description                       |
/// |-------------|--------------------|-----------------------------------|
/// | id          | TEXT (Primary Key) | Session ID                        |
/// | data        | BLOB / BYTEA       | MessagePack-encoded session record |
/// | expiry_date | TIMESTAMPTZ        | Session expiration timestamp      |
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    pub data: Vec<u8>,
    pub expiry_date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

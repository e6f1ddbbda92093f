//! Database entity models for seatmap.
//!
//! Each submodule is a Sea-ORM entity mapping one table. The domain tables
//! (users, locations, reviews, pictures and the lookup dictionaries) are
//! created by [`crate::migration`]; `admin_session` backs the admin console's
//! session store.

use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, Set};

pub mod admin_session;
pub mod condition;
pub mod location_review;
pub mod location_seat;
pub mod material;
pub mod picture;
pub mod pollution;
pub mod review;
pub mod role;
pub mod seat_type;
pub mod status;
pub mod user;

/// A lookup table with an integer `id` and a unique `name`.
///
/// Implemented for [`seat_type`], [`status`], [`material`], [`condition`] and
/// [`pollution`], so seeding and the dictionary routes can be written once
/// for all five tables.
pub trait Dictionary: EntityTrait {
    type Active: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send + 'static;

    fn id_column() -> Self::Column;

    /// Splits a row into its id and name.
    fn into_parts(model: Self::Model) -> (i32, String);

    /// An unsaved row named `name`.
    fn new_row(name: String) -> Self::Active;

    fn rename(row: &mut Self::Active, name: String);
}

macro_rules! dictionary {
    ($($module:ident),+ $(,)?) => {$(
        impl Dictionary for $module::Entity {
            type Active = $module::ActiveModel;

            fn id_column() -> Self::Column {
                $module::Column::Id
            }

            fn into_parts(model: $module::Model) -> (i32, String) {
                (model.id, model.name)
            }

            fn new_row(name: String) -> Self::Active {
                $module::ActiveModel {
                    name: Set(name),
                    ..Default::default()
                }
            }

            fn rename(row: &mut Self::Active, name: String) {
                row.name = Set(name);
            }
        }
    )+};
}

dictionary!(seat_type, status, material, condition, pollution);

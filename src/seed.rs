//! Reference data for a fresh database and a way to wipe it again.

use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use tracing::info;

use crate::entity::{
    admin_session, condition, location_review, location_seat, material, picture, pollution,
    review, role, seat_type, status, user, Dictionary,
};
use crate::error::{ApiError, ApiResult};
use crate::security::hash_password_async;

pub const STATUSES: &[&str] = &["Active", "Under repair", "Temporarily unavailable"];
pub const SEAT_TYPES: &[&str] = &["Bench", "Gazebo"];
pub const MATERIALS: &[&str] = &["Wood", "Metal", "Concrete", "Plastic", "Mixed", "Stone"];
pub const CONDITIONS: &[&str] = &["Perfect", "Good", "Fair", "Poor", "Dangerous"];
pub const POLLUTIONS: &[&str] = &[
    "Clean",
    "A little litter",
    "Dirty",
    "Dump",
    "Overflowing bin",
];

/// A default account created by [`seed_all`].
pub struct DefaultUser {
    pub username: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: &'static str,
}

pub const DEFAULT_USERS: &[DefaultUser] = &[
    DefaultUser {
        username: "admin",
        email: "admin@admin.com",
        password: "admin123",
        role: role::ADMIN_ROLE_NAME,
    },
    DefaultUser {
        username: "user",
        email: "user@user.com",
        password: "user123",
        role: role::USER_ROLE_NAME,
    },
];

/// Inserts roles, default users and every dictionary. Rows that already exist
/// (by name, or by email for users) are left alone, so running it twice is
/// harmless.
pub async fn seed_all(db: &DatabaseConnection, bcrypt_cost: u32) -> ApiResult<()> {
    seed_roles(db).await?;
    seed_users(db, bcrypt_cost).await?;
    seed_names::<status::Entity>(db, "statuses", STATUSES).await?;
    seed_names::<seat_type::Entity>(db, "seat types", SEAT_TYPES).await?;
    seed_names::<material::Entity>(db, "materials", MATERIALS).await?;
    seed_names::<condition::Entity>(db, "conditions", CONDITIONS).await?;
    seed_names::<pollution::Entity>(db, "pollutions", POLLUTIONS).await?;
    Ok(())
}

async fn seed_roles(db: &DatabaseConnection) -> ApiResult<()> {
    let existing: HashSet<String> = role::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.role_name)
        .collect();

    for name in [role::ADMIN_ROLE_NAME, role::USER_ROLE_NAME] {
        if existing.contains(name) {
            continue;
        }
        role::ActiveModel {
            role_name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(role = name, "role added");
    }
    Ok(())
}

async fn seed_users(db: &DatabaseConnection, bcrypt_cost: u32) -> ApiResult<()> {
    for account in DEFAULT_USERS {
        let role_id = role::Entity::find()
            .filter(role::Column::RoleName.eq(account.role))
            .one(db)
            .await?
            .map(|row| row.id)
            .ok_or_else(|| ApiError::internal(format!("role {} is missing", account.role)))?;

        let exists = user::Entity::find()
            .filter(user::Column::Email.eq(account.email))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let password = hash_password_async(account.password.to_string(), bcrypt_cost).await?;
        user::ActiveModel {
            username: Set(account.username.to_string()),
            email: Set(account.email.to_string()),
            password: Set(password),
            role_id: Set(Some(role_id)),
            ..Default::default()
        }
        .insert(db)
        .await?;
        info!(email = account.email, role = account.role, "default user added");
    }
    Ok(())
}

async fn seed_names<D>(db: &DatabaseConnection, label: &str, names: &[&str]) -> ApiResult<()>
where
    D: Dictionary,
    D::Model: IntoActiveModel<D::Active>,
{
    let existing: HashSet<String> = D::find()
        .all(db)
        .await?
        .into_iter()
        .map(|model| D::into_parts(model).1)
        .collect();

    let mut added = 0;
    for name in names.iter().filter(|name| !existing.contains(**name)) {
        D::new_row(name.to_string()).insert(db).await?;
        added += 1;
    }
    info!(table = label, added, "dictionary seeded");
    Ok(())
}

/// Removes every row from every domain table, children first.
pub async fn clean(db: &DatabaseConnection) -> Result<(), DbErr> {
    if db.get_database_backend() == DatabaseBackend::Postgres {
        db.execute_unprepared(
            "TRUNCATE TABLE location_seat_reviews, pictures, reviews, location_seats, users, \
             roles, seat_types, statuses, materials, conditions, pollutions, admin_sessions \
             RESTART IDENTITY CASCADE",
        )
        .await?;
        info!("all tables truncated");
        return Ok(());
    }

    let txn = db.begin().await?;
    location_review::Entity::delete_many().exec(&txn).await?;
    picture::Entity::delete_many().exec(&txn).await?;
    review::Entity::delete_many().exec(&txn).await?;
    location_seat::Entity::delete_many().exec(&txn).await?;
    user::Entity::delete_many().exec(&txn).await?;
    role::Entity::delete_many().exec(&txn).await?;
    seat_type::Entity::delete_many().exec(&txn).await?;
    status::Entity::delete_many().exec(&txn).await?;
    material::Entity::delete_many().exec(&txn).await?;
    condition::Entity::delete_many().exec(&txn).await?;
    pollution::Entity::delete_many().exec(&txn).await?;
    admin_session::Entity::delete_many().exec(&txn).await?;
    txn.commit().await?;
    info!("all tables emptied");
    Ok(())
}

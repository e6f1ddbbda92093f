use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn dictionary_table<T: IntoIden + Copy + 'static>(table: T, id: T, name: T) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(id_col(id))
        .col(ColumnDef::new(name).string_len(255).not_null())
        .to_owned()
}

/// Coordinate column holding values in `-bound..=bound`.
///
/// SQLite caps decimal precision at 16 digits, so it gets a narrower scale
/// than the other backends.
fn coordinate_col<T>(col: T, backend: DatabaseBackend, bound: i32) -> ColumnDef
where
    T: IntoIden + Copy + 'static,
{
    let (precision, scale) = match backend {
        DatabaseBackend::Sqlite => (16, 12),
        _ => (20, 15),
    };
    ColumnDef::new(col)
        .decimal_len(precision, scale)
        .not_null()
        .check(Expr::col(col).between(-bound, bound))
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(id_col(Roles::Id))
                    .col(
                        ColumnDef::new(Roles::RoleName)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_col(Users::Id))
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string_len(255).not_null())
                    .col(ColumnDef::new(Users::RoleId).integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_role")
                            .from(Users::Table, Users::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(dictionary_table(SeatTypes::Table, SeatTypes::Id, SeatTypes::Name))
            .await?;
        manager
            .create_table(dictionary_table(Statuses::Table, Statuses::Id, Statuses::Name))
            .await?;
        manager
            .create_table(dictionary_table(Materials::Table, Materials::Id, Materials::Name))
            .await?;
        manager
            .create_table(dictionary_table(
                Conditions::Table,
                Conditions::Id,
                Conditions::Name,
            ))
            .await?;
        manager
            .create_table(dictionary_table(
                Pollutions::Table,
                Pollutions::Id,
                Pollutions::Name,
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LocationSeats::Table)
                    .if_not_exists()
                    .col(id_col(LocationSeats::Id))
                    .col(ColumnDef::new(LocationSeats::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(LocationSeats::Description)
                            .string_len(1000)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LocationSeats::Address)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LocationSeats::TypeId).integer().not_null())
                    .col(ColumnDef::new(LocationSeats::StatusId).integer().not_null())
                    .col(coordinate_col(LocationSeats::CordX, backend, 90))
                    .col(coordinate_col(LocationSeats::CordY, backend, 180))
                    .col(ColumnDef::new(LocationSeats::AuthorId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_seats_type")
                            .from(LocationSeats::Table, LocationSeats::TypeId)
                            .to(SeatTypes::Table, SeatTypes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_seats_status")
                            .from(LocationSeats::Table, LocationSeats::StatusId)
                            .to(Statuses::Table, Statuses::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_seats_author")
                            .from(LocationSeats::Table, LocationSeats::AuthorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Pictures::Table)
                    .if_not_exists()
                    .col(id_col(Pictures::Id))
                    .col(ColumnDef::new(Pictures::Url).string_len(255).not_null())
                    .col(ColumnDef::new(Pictures::LocationId).integer().not_null())
                    .col(ColumnDef::new(Pictures::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pictures_location")
                            .from(Pictures::Table, Pictures::LocationId)
                            .to(LocationSeats::Table, LocationSeats::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pictures_user")
                            .from(Pictures::Table, Pictures::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(id_col(Reviews::Id))
                    .col(ColumnDef::new(Reviews::Rate).big_integer().not_null())
                    .col(ColumnDef::new(Reviews::AuthorId).integer().not_null())
                    .col(
                        ColumnDef::new(Reviews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Reviews::PollutionId).integer().not_null())
                    .col(ColumnDef::new(Reviews::ConditionId).integer().not_null())
                    .col(ColumnDef::new(Reviews::MaterialId).integer().not_null())
                    .col(
                        ColumnDef::new(Reviews::SeatingPositions)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_author")
                            .from(Reviews::Table, Reviews::AuthorId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_pollution")
                            .from(Reviews::Table, Reviews::PollutionId)
                            .to(Pollutions::Table, Pollutions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_condition")
                            .from(Reviews::Table, Reviews::ConditionId)
                            .to(Conditions::Table, Conditions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_material")
                            .from(Reviews::Table, Reviews::MaterialId)
                            .to(Materials::Table, Materials::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LocationSeatReviews::Table)
                    .if_not_exists()
                    .col(id_col(LocationSeatReviews::Id))
                    .col(
                        ColumnDef::new(LocationSeatReviews::LocationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LocationSeatReviews::ReviewId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_seat_reviews_location")
                            .from(LocationSeatReviews::Table, LocationSeatReviews::LocationId)
                            .to(LocationSeats::Table, LocationSeats::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_location_seat_reviews_review")
                            .from(LocationSeatReviews::Table, LocationSeatReviews::ReviewId)
                            .to(Reviews::Table, Reviews::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("unique_location_review")
                    .table(LocationSeatReviews::Table)
                    .col(LocationSeatReviews::LocationId)
                    .col(LocationSeatReviews::ReviewId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_location_seats_coords")
                    .table(LocationSeats::Table)
                    .col(LocationSeats::CordX)
                    .col(LocationSeats::CordY)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LocationSeatReviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pictures::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LocationSeats::Table).to_owned())
            .await?;
        for table in [
            Pollutions::Table.into_iden(),
            Conditions::Table.into_iden(),
            Materials::Table.into_iden(),
            Statuses::Table.into_iden(),
            SeatTypes::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    RoleName,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    Password,
    RoleId,
}

#[derive(DeriveIden, Clone, Copy)]
enum SeatTypes {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden, Clone, Copy)]
enum Statuses {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden, Clone, Copy)]
enum Materials {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden, Clone, Copy)]
enum Conditions {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden, Clone, Copy)]
enum Pollutions {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden, Clone, Copy)]
enum LocationSeats {
    Table,
    Id,
    Name,
    Description,
    Address,
    TypeId,
    StatusId,
    CordX,
    CordY,
    AuthorId,
}

#[derive(DeriveIden)]
enum Pictures {
    Table,
    Id,
    Url,
    LocationId,
    UserId,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    Rate,
    AuthorId,
    CreatedAt,
    PollutionId,
    ConditionId,
    MaterialId,
    SeatingPositions,
}

#[derive(DeriveIden)]
enum LocationSeatReviews {
    Table,
    Id,
    LocationId,
    ReviewId,
}

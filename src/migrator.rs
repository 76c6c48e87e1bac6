use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_categories_table::Migration),
            Box::new(m20240101_000002_create_costumes_table::Migration),
            Box::new(m20240101_000003_create_accessories_table::Migration),
            Box::new(m20240101_000004_create_bookings_table::Migration),
            Box::new(m20240101_000005_create_booking_items_table::Migration),
        ]
    }
}

mod m20240101_000001_create_categories_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_categories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Description).text().null())
                        .col(ColumnDef::new(Categories::CategoryType).string().not_null())
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_type")
                        .table(Categories::Table)
                        .col(Categories::CategoryType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Categories {
        Table,
        Id,
        Name,
        Description,
        CategoryType,
        CreatedAt,
        UpdatedAt,
    }
}

/// Costumes and accessories share one column layout; only the tag list column differs.
fn inventory_table<T, C>(table: T, tag_column: C) -> TableCreateStatement
where
    T: IntoIden + Copy + 'static,
    C: IntoIden,
{
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(InventoryColumn::Id)
                .uuid()
                .primary_key()
                .not_null(),
        )
        .col(ColumnDef::new(InventoryColumn::Name).string().not_null())
        .col(ColumnDef::new(InventoryColumn::Description).text().null())
        .col(ColumnDef::new(InventoryColumn::CategoryId).uuid().not_null())
        .col(
            ColumnDef::new(InventoryColumn::PricePerDay)
                .decimal_len(12, 2)
                .not_null(),
        )
        .col(
            ColumnDef::new(InventoryColumn::SecurityDeposit)
                .decimal_len(12, 2)
                .not_null()
                .default(0),
        )
        .col(ColumnDef::new(InventoryColumn::Sizes).json().not_null())
        .col(ColumnDef::new(tag_column).json().not_null())
        .col(ColumnDef::new(InventoryColumn::ImageUrl).string().null())
        .col(
            ColumnDef::new(InventoryColumn::Status)
                .string()
                .not_null()
                .default("available"),
        )
        .col(
            ColumnDef::new(InventoryColumn::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(InventoryColumn::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(table, InventoryColumn::CategoryId)
                .to(
                    m20240101_000001_create_categories_table::Categories::Table,
                    m20240101_000001_create_categories_table::Categories::Id,
                )
                .on_delete(ForeignKeyAction::Restrict)
                .on_update(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[derive(DeriveIden)]
enum InventoryColumn {
    Id,
    Name,
    Description,
    CategoryId,
    PricePerDay,
    SecurityDeposit,
    Sizes,
    ImageUrl,
    Status,
    CreatedAt,
    UpdatedAt,
}

mod m20240101_000002_create_costumes_table {
    use super::inventory_table;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_costumes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(inventory_table(Costumes::Table, Costumes::Themes))
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_costumes_category_id")
                        .table(Costumes::Table)
                        .col(Costumes::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_costumes_status")
                        .table(Costumes::Table)
                        .col(Costumes::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Costumes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum Costumes {
        Table,
        CategoryId,
        Themes,
        Status,
    }
}

mod m20240101_000003_create_accessories_table {
    use super::inventory_table;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_accessories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(inventory_table(
                    Accessories::Table,
                    Accessories::LinkedCharacters,
                ))
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_accessories_category_id")
                        .table(Accessories::Table)
                        .col(Accessories::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_accessories_status")
                        .table(Accessories::Table)
                        .col(Accessories::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Accessories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum Accessories {
        Table,
        CategoryId,
        LinkedCharacters,
        Status,
    }
}

mod m20240101_000004_create_bookings_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_bookings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Bookings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Bookings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Bookings::UserId).uuid().null())
                        .col(ColumnDef::new(Bookings::CustomerName).string().not_null())
                        .col(ColumnDef::new(Bookings::CustomerEmail).string().not_null())
                        .col(ColumnDef::new(Bookings::CustomerPhone).string().null())
                        .col(
                            ColumnDef::new(Bookings::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Bookings::EndDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Bookings::TotalAmount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Bookings::SecurityDeposit)
                                .decimal_len(13, 3)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Bookings::Status)
                                .string()
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(Bookings::PaymentStatus)
                                .string()
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Bookings::Notes).text().null())
                        .col(
                            ColumnDef::new(Bookings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Bookings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bookings_user_id")
                        .table(Bookings::Table)
                        .col(Bookings::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bookings_status")
                        .table(Bookings::Table)
                        .col(Bookings::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Bookings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Bookings {
        Table,
        Id,
        UserId,
        CustomerName,
        CustomerEmail,
        CustomerPhone,
        StartDate,
        EndDate,
        TotalAmount,
        SecurityDeposit,
        Status,
        PaymentStatus,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_booking_items_table {
    use super::m20240101_000004_create_bookings_table::Bookings;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_booking_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // item_id is not a foreign key: it points into costumes or accessories depending on item_type
            manager
                .create_table(
                    Table::create()
                        .table(BookingItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BookingItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BookingItems::BookingId).uuid().not_null())
                        .col(ColumnDef::new(BookingItems::ItemType).string().not_null())
                        .col(ColumnDef::new(BookingItems::ItemId).uuid().not_null())
                        .col(ColumnDef::new(BookingItems::ItemName).string().not_null())
                        .col(ColumnDef::new(BookingItems::Size).string().null())
                        .col(
                            ColumnDef::new(BookingItems::PricePerDay)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(BookingItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_booking_items_booking_id")
                                .from(BookingItems::Table, BookingItems::BookingId)
                                .to(Bookings::Table, Bookings::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_booking_items_booking_id")
                        .table(BookingItems::Table)
                        .col(BookingItems::BookingId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_booking_items_item")
                        .table(BookingItems::Table)
                        .col(BookingItems::ItemId)
                        .col(BookingItems::ItemType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BookingItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BookingItems {
        Table,
        Id,
        BookingId,
        ItemType,
        ItemId,
        ItemName,
        Size,
        PricePerDay,
        Quantity,
        CreatedAt,
    }
}

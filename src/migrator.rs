use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog_tables::Migration),
            Box::new(m20250101_000002_create_sites_and_calls_tables::Migration),
            Box::new(m20250101_000003_create_diary_entries_table::Migration),
            Box::new(m20250101_000004_create_purchase_order_tables::Migration),
            Box::new(m20250101_000005_create_delivery_challan_tables::Migration),
        ]
    }
}

mod m20250101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Code).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).string().null())
                        .col(
                            ColumnDef::new(Products::OnHand)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::UnitCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::SellingPrice).decimal().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_products_code")
                        .table(Products::Table)
                        .col(Products::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::QuantityDelta)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::PreviousQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::NewQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::ReferenceType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ReferenceId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::Reason).string().not_null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_product")
                                .from(StockMovements::Table, StockMovements::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_movements_product_id")
                        .table(StockMovements::Table)
                        .col(StockMovements::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Sequences::Key)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sequences::LastValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sequences::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Code,
        Name,
        Description,
        OnHand,
        UnitCost,
        SellingPrice,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        ProductId,
        QuantityDelta,
        PreviousQuantity,
        NewQuantity,
        ReferenceType,
        ReferenceId,
        Reason,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Sequences {
        Table,
        Key,
        LastValue,
    }
}

mod m20250101_000002_create_sites_and_calls_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_sites_and_calls_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sites::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sites::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sites::Code).string().not_null())
                        .col(ColumnDef::new(Sites::Name).string().not_null())
                        .col(ColumnDef::new(Sites::CustomerName).string().null())
                        .col(ColumnDef::new(Sites::Address).string().null())
                        .col(
                            ColumnDef::new(Sites::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sites::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_sites_code")
                        .table(Sites::Table)
                        .col(Sites::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Calls::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Calls::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Calls::CallNumber).string().not_null())
                        .col(ColumnDef::new(Calls::SiteId).uuid().not_null())
                        .col(ColumnDef::new(Calls::SystemId).string().null())
                        .col(ColumnDef::new(Calls::CallType).string().null())
                        .col(ColumnDef::new(Calls::Reason).string().null())
                        .col(ColumnDef::new(Calls::EngineerId).string().null())
                        .col(
                            ColumnDef::new(Calls::Deadline)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Calls::NextAction)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Calls::Waiting)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Calls::WaitingReason).string().null())
                        .col(
                            ColumnDef::new(Calls::Status)
                                .string()
                                .not_null()
                                .default("open"),
                        )
                        .col(ColumnDef::new(Calls::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(Calls::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Calls::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_calls_site")
                                .from(Calls::Table, Calls::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_calls_call_number")
                        .table(Calls::Table)
                        .col(Calls::CallNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_calls_site_id")
                        .table(Calls::Table)
                        .col(Calls::SiteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Calls::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sites::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sites {
        Table,
        Id,
        Code,
        Name,
        CustomerName,
        Address,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Calls {
        Table,
        Id,
        CallNumber,
        SiteId,
        SystemId,
        CallType,
        Reason,
        EngineerId,
        Deadline,
        NextAction,
        Waiting,
        WaitingReason,
        Status,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_diary_entries_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_diary_entries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DiaryEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DiaryEntries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DiaryEntries::SiteId).uuid().not_null())
                        .col(ColumnDef::new(DiaryEntries::CallId).uuid().not_null())
                        .col(ColumnDef::new(DiaryEntries::EngineerId).string().not_null())
                        .col(ColumnDef::new(DiaryEntries::Date).date().not_null())
                        .col(
                            ColumnDef::new(DiaryEntries::StartTime)
                                .string_len(5)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiaryEntries::EndTime)
                                .string_len(5)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DiaryEntries::Duration).string().not_null())
                        .col(
                            ColumnDef::new(DiaryEntries::Status)
                                .string()
                                .not_null()
                                .default("scheduled"),
                        )
                        .col(ColumnDef::new(DiaryEntries::Notes).string().null())
                        .col(
                            ColumnDef::new(DiaryEntries::IsInitialAssignment)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(DiaryEntries::CreatedBy).string().not_null())
                        .col(ColumnDef::new(DiaryEntries::UpdatedBy).string().null())
                        .col(
                            ColumnDef::new(DiaryEntries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DiaryEntries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_diary_entries_call")
                                .from(DiaryEntries::Table, DiaryEntries::CallId)
                                .to(Calls::Table, Calls::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_diary_entries_engineer_date")
                        .table(DiaryEntries::Table)
                        .col(DiaryEntries::EngineerId)
                        .col(DiaryEntries::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_diary_entries_call_id")
                        .table(DiaryEntries::Table)
                        .col(DiaryEntries::CallId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DiaryEntries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DiaryEntries {
        Table,
        Id,
        SiteId,
        CallId,
        EngineerId,
        Date,
        StartTime,
        EndTime,
        Duration,
        Status,
        Notes,
        IsInitialAssignment,
        CreatedBy,
        UpdatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Calls {
        Table,
        Id,
    }
}

mod m20250101_000004_create_purchase_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_purchase_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::PoNumber).string().not_null())
                        .col(ColumnDef::new(PurchaseOrders::Supplier).string().not_null())
                        .col(ColumnDef::new(PurchaseOrders::OrderedDate).date().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PurchaseOrders::Notes).string().null())
                        .col(ColumnDef::new(PurchaseOrders::AttachmentPath).string().null())
                        .col(ColumnDef::new(PurchaseOrders::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_purchase_orders_po_number")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::PoNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrderItems::LineTotal)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_order_items_order")
                                .from(
                                    PurchaseOrderItems::Table,
                                    PurchaseOrderItems::PurchaseOrderId,
                                )
                                .to(PurchaseOrders::Table, PurchaseOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_order_items_order_id")
                        .table(PurchaseOrderItems::Table)
                        .col(PurchaseOrderItems::PurchaseOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
        PoNumber,
        Supplier,
        OrderedDate,
        TotalAmount,
        Notes,
        AttachmentPath,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseOrderItems {
        Table,
        Id,
        PurchaseOrderId,
        ProductId,
        Quantity,
        UnitPrice,
        LineTotal,
    }
}

mod m20250101_000005_create_delivery_challan_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_delivery_challan_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryChallans::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryChallans::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryChallans::ChallanNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryChallans::CompanyId).string().null())
                        .col(
                            ColumnDef::new(DeliveryChallans::CustomerId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryChallans::SiteId).uuid().null())
                        .col(
                            ColumnDef::new(DeliveryChallans::ChallanDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryChallans::Notes).string().null())
                        .col(
                            ColumnDef::new(DeliveryChallans::AttachmentPath)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryChallans::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryChallans::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryChallans::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_delivery_challans_challan_number")
                        .table(DeliveryChallans::Table)
                        .col(DeliveryChallans::ChallanNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeliveryChallanItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryChallanItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryChallanItems::DeliveryChallanId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryChallanItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryChallanItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_delivery_challan_items_challan")
                                .from(
                                    DeliveryChallanItems::Table,
                                    DeliveryChallanItems::DeliveryChallanId,
                                )
                                .to(DeliveryChallans::Table, DeliveryChallans::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_challan_items_challan_id")
                        .table(DeliveryChallanItems::Table)
                        .col(DeliveryChallanItems::DeliveryChallanId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryChallanItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeliveryChallans::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DeliveryChallans {
        Table,
        Id,
        ChallanNumber,
        CompanyId,
        CustomerId,
        SiteId,
        ChallanDate,
        Notes,
        AttachmentPath,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum DeliveryChallanItems {
        Table,
        Id,
        DeliveryChallanId,
        ProductId,
        Quantity,
    }
}

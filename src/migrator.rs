use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_bill_of_materials_tables::Migration),
            Box::new(m20240301_000002_create_production_orders_table::Migration),
            Box::new(m20240615_000001_create_production_batch_tables::Migration),
        ]
    }
}

/// Column set shared by every hub record.
mod hub_base {
    use sea_orm_migration::prelude::*;

    pub(super) fn table<T: IntoIden + 'static>(table: T) -> TableCreateStatement {
        Table::create()
            .table(table)
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("id"))
                    .uuid()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(Alias::new("hub_id")).uuid().not_null())
            .col(
                ColumnDef::new(Alias::new("created_at"))
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(
                ColumnDef::new(Alias::new("updated_at"))
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .col(
                ColumnDef::new(Alias::new("is_deleted"))
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(
                ColumnDef::new(Alias::new("deleted_at"))
                    .timestamp_with_time_zone()
                    .null(),
            )
            .to_owned()
    }

    /// Every default query filters on `(hub_id, is_deleted)`.
    pub(super) fn scope_index<T: IntoIden + 'static>(name: &str, table: T) -> IndexCreateStatement {
        Index::create()
            .if_not_exists()
            .name(name)
            .table(table)
            .col(Alias::new("hub_id"))
            .col(Alias::new("is_deleted"))
            .to_owned()
    }
}

mod m20240301_000001_create_bill_of_materials_tables {
    use super::hub_base;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_bill_of_materials_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut boms = hub_base::table(BillOfMaterials::Table);
            boms.col(
                ColumnDef::new(BillOfMaterials::Name)
                    .string_len(255)
                    .not_null(),
            )
            .col(
                ColumnDef::new(BillOfMaterials::Code)
                    .string_len(50)
                    .not_null()
                    .default(""),
            )
            .col(
                ColumnDef::new(BillOfMaterials::OutputQuantity)
                    .decimal_len(10, 2)
                    .not_null()
                    .default(1),
            )
            .col(
                ColumnDef::new(BillOfMaterials::Notes)
                    .text()
                    .not_null()
                    .default(""),
            )
            .col(
                ColumnDef::new(BillOfMaterials::IsActive)
                    .boolean()
                    .not_null()
                    .default(true),
            );
            manager.create_table(boms).await?;

            manager
                .create_index(hub_base::scope_index(
                    "idx_manufacturing_billofmaterials_scope",
                    BillOfMaterials::Table,
                ))
                .await?;

            let mut lines = hub_base::table(BomLine::Table);
            lines
                .col(ColumnDef::new(BomLine::BomId).uuid().not_null())
                .col(
                    ColumnDef::new(BomLine::Description)
                        .string_len(255)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(BomLine::Quantity)
                        .decimal_len(10, 2)
                        .not_null()
                        .default(1),
                )
                .col(
                    ColumnDef::new(BomLine::Unit)
                        .string_len(20)
                        .not_null()
                        .default(""),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_manufacturing_bomline_bom_id")
                        .from(BomLine::Table, BomLine::BomId)
                        .to(BillOfMaterials::Table, BillOfMaterials::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .on_update(ForeignKeyAction::Cascade),
                );
            manager.create_table(lines).await?;

            manager
                .create_index(hub_base::scope_index(
                    "idx_manufacturing_bomline_scope",
                    BomLine::Table,
                ))
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_manufacturing_bomline_bom_id")
                        .table(BomLine::Table)
                        .col(BomLine::BomId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BomLine::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BillOfMaterials::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum BillOfMaterials {
        #[sea_orm(iden = "manufacturing_billofmaterials")]
        Table,
        Id,
        Name,
        Code,
        OutputQuantity,
        Notes,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum BomLine {
        #[sea_orm(iden = "manufacturing_bomline")]
        Table,
        BomId,
        Description,
        Quantity,
        Unit,
    }
}

mod m20240301_000002_create_production_orders_table {
    use super::hub_base;
    use super::m20240301_000001_create_bill_of_materials_tables::BillOfMaterials;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_production_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut orders = hub_base::table(ProductionOrder::Table);
            orders
                .col(
                    ColumnDef::new(ProductionOrder::OrderNumber)
                        .string_len(50)
                        .not_null(),
                )
                .col(ColumnDef::new(ProductionOrder::BomId).uuid().null())
                .col(
                    ColumnDef::new(ProductionOrder::Quantity)
                        .decimal_len(10, 2)
                        .not_null()
                        .default(1),
                )
                .col(
                    ColumnDef::new(ProductionOrder::BatchNumber)
                        .string_len(50)
                        .not_null()
                        .default(""),
                )
                .col(ColumnDef::new(ProductionOrder::ExpiryDate).date().null())
                .col(
                    ColumnDef::new(ProductionOrder::Status)
                        .string_len(20)
                        .not_null()
                        .default("draft"),
                )
                .col(ColumnDef::new(ProductionOrder::StartDate).date().null())
                .col(ColumnDef::new(ProductionOrder::EndDate).date().null())
                .col(
                    ColumnDef::new(ProductionOrder::Notes)
                        .text()
                        .not_null()
                        .default(""),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_manufacturing_productionorder_bom_id")
                        .from(ProductionOrder::Table, ProductionOrder::BomId)
                        .to(BillOfMaterials::Table, BillOfMaterials::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                        .on_update(ForeignKeyAction::Cascade),
                );
            manager.create_table(orders).await?;

            manager
                .create_index(hub_base::scope_index(
                    "idx_manufacturing_productionorder_scope",
                    ProductionOrder::Table,
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionOrder::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum ProductionOrder {
        #[sea_orm(iden = "manufacturing_productionorder")]
        Table,
        Id,
        OrderNumber,
        BomId,
        Quantity,
        BatchNumber,
        ExpiryDate,
        Status,
        StartDate,
        EndDate,
        Notes,
    }
}

mod m20240615_000001_create_production_batch_tables {
    use super::hub_base;
    use super::m20240301_000001_create_bill_of_materials_tables::BillOfMaterials;
    use super::m20240301_000002_create_production_orders_table::ProductionOrder;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240615_000001_create_production_batch_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut batches = hub_base::table(Batch::Table);
            batches
                .col(
                    ColumnDef::new(Batch::BatchNumber)
                        .string_len(50)
                        .not_null(),
                )
                .col(ColumnDef::new(Batch::ProductionOrderId).uuid().null())
                .col(ColumnDef::new(Batch::BomId).uuid().null())
                .col(
                    ColumnDef::new(Batch::QuantityProduced)
                        .decimal_len(10, 2)
                        .not_null()
                        .default(0),
                )
                .col(ColumnDef::new(Batch::ProductionDate).date().null())
                .col(ColumnDef::new(Batch::ExpiryDate).date().null())
                .col(
                    ColumnDef::new(Batch::QualityStatus)
                        .string_len(20)
                        .not_null()
                        .default("pending"),
                )
                .col(ColumnDef::new(Batch::Notes).text().not_null().default(""))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_manufacturing_batch_production_order_id")
                        .from(Batch::Table, Batch::ProductionOrderId)
                        .to(ProductionOrder::Table, ProductionOrder::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                        .on_update(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_manufacturing_batch_bom_id")
                        .from(Batch::Table, Batch::BomId)
                        .to(BillOfMaterials::Table, BillOfMaterials::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                        .on_update(ForeignKeyAction::Cascade),
                );
            manager.create_table(batches).await?;

            manager
                .create_index(hub_base::scope_index(
                    "idx_manufacturing_batch_scope",
                    Batch::Table,
                ))
                .await?;

            let mut ingredients = hub_base::table(BatchIngredient::Table);
            ingredients
                .col(ColumnDef::new(BatchIngredient::BatchId).uuid().not_null())
                .col(
                    ColumnDef::new(BatchIngredient::Description)
                        .string_len(255)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(BatchIngredient::SupplierLot)
                        .string_len(100)
                        .not_null()
                        .default(""),
                )
                .col(
                    ColumnDef::new(BatchIngredient::QuantityUsed)
                        .decimal_len(10, 2)
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(BatchIngredient::Unit)
                        .string_len(20)
                        .not_null()
                        .default(""),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_manufacturing_batchingredient_batch_id")
                        .from(BatchIngredient::Table, BatchIngredient::BatchId)
                        .to(Batch::Table, Batch::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .on_update(ForeignKeyAction::Cascade),
                );
            manager.create_table(ingredients).await?;

            manager
                .create_index(hub_base::scope_index(
                    "idx_manufacturing_batchingredient_scope",
                    BatchIngredient::Table,
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BatchIngredient::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Batch::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Batch {
        #[sea_orm(iden = "manufacturing_batch")]
        Table,
        Id,
        BatchNumber,
        ProductionOrderId,
        BomId,
        QuantityProduced,
        ProductionDate,
        ExpiryDate,
        QualityStatus,
        Notes,
    }

    #[derive(DeriveIden)]
    enum BatchIngredient {
        #[sea_orm(iden = "manufacturing_batchingredient")]
        Table,
        BatchId,
        Description,
        SupplierLot,
        QuantityUsed,
        Unit,
    }
}

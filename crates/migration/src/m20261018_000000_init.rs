//! Initial schema for the exchange desk:
//!
//! - `operations`: purchases and sales, including trashed ones (`deleted_at`)
//! - `lots`: snapshot of the open lots of each account
//! - `rates`: official, buy and sell rates of each account

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Operations {
    Table,
    Id,
    AccountId,
    Date,
    Kind,
    UsdMinor,
    PenMinor,
    RateUnits,
    ProfitMinor,
    BlocksUsed,
    DeletedAt,
    Seq,
}

#[derive(Iden)]
enum Lots {
    Table,
    Id,
    AccountId,
    AmountMinor,
    RateUnits,
    CreatedAt,
}

#[derive(Iden)]
enum Rates {
    Table,
    AccountId,
    OfficialUnits,
    BuyUnits,
    SellUnits,
    LastUpdate,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Rates
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Rates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rates::AccountId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Rates::OfficialUnits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Rates::BuyUnits).big_integer().not_null())
                    .col(ColumnDef::new(Rates::SellUnits).big_integer().not_null())
                    .col(ColumnDef::new(Rates::LastUpdate).timestamp())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Operations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Operations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Operations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Operations::AccountId).string().not_null())
                    .col(ColumnDef::new(Operations::Date).timestamp().not_null())
                    .col(ColumnDef::new(Operations::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Operations::UsdMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operations::PenMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operations::RateUnits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operations::ProfitMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Operations::BlocksUsed)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Operations::DeletedAt).timestamp())
                    .col(
                        ColumnDef::new(Operations::Seq)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-operations-account_id-date")
                    .table(Operations::Table)
                    .col(Operations::AccountId)
                    .col(Operations::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-operations-deleted_at")
                    .table(Operations::Table)
                    .col(Operations::DeletedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Lots
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Lots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Lots::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Lots::AccountId).string().not_null())
                    .col(ColumnDef::new(Lots::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Lots::RateUnits).big_integer().not_null())
                    .col(ColumnDef::new(Lots::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-lots-account_id-rate_units")
                    .table(Lots::Table)
                    .col(Lots::AccountId)
                    .col(Lots::RateUnits)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Lots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Operations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rates::Table).to_owned())
            .await?;
        Ok(())
    }
}

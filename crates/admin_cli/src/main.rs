use std::error::Error;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use engine::{Currency, Engine, LotLedger};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "cambista_admin")]
#[command(about = "Maintenance utilities for the Cambista exchange desk")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./cambista.db?mode=rwc"
    )]
    database_url: String,

    /// Days a trashed operation is kept before purge.
    #[arg(long, default_value_t = engine::DEFAULT_TRASH_RETENTION_DAYS)]
    retention_days: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild lot ledgers from the operation history.
    Rebuild(RebuildArgs),
    /// Print the lot ledger of an account.
    Ledger(AccountArgs),
    /// Print the receipt of an operation.
    Receipt(ReceiptArgs),
    /// Delete trashed operations past their retention.
    PurgeTrash,
}

#[derive(Args, Debug)]
struct RebuildArgs {
    /// Account to rebuild; every account when omitted.
    account: Option<String>,
}

#[derive(Args, Debug)]
struct AccountArgs {
    account: String,
}

#[derive(Args, Debug)]
struct ReceiptArgs {
    account: String,
    id: Uuid,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_ledger(account: &str, ledger: &LotLedger) {
    println!("ledger {account}");
    for lot in ledger.lots() {
        println!(
            "  {:>14} @ {}",
            Currency::Usd.format(lot.amount),
            lot.rate
        );
    }
    println!("  total {}", Currency::Usd.format(ledger.total_available()));
    if let Some(rate) = ledger.average_rate() {
        println!("  average {}", Currency::Pen.format_rate(rate));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder()
        .database(db)
        .trash_retention(chrono::Duration::days(cli.retention_days))
        .build()
        .await?;

    match cli.command {
        Command::Rebuild(args) => {
            let accounts = match args.account {
                Some(account) => vec![account],
                None => engine.accounts().await?,
            };
            for account in accounts {
                let ledger = engine.rebuild_ledger(&account).await?;
                print_ledger(&account, &ledger);
            }
        }
        Command::Ledger(args) => {
            let ledger = engine.ledger(&args.account).await?;
            print_ledger(&args.account, &ledger);
        }
        Command::Receipt(args) => {
            let receipt = engine.receipt(&args.account, args.id).await?;
            println!("{receipt}");
        }
        Command::PurgeTrash => {
            let purged = engine.purge_expired_trash(Utc::now()).await?;
            println!("purged {purged} operations");
        }
    }

    Ok(())
}

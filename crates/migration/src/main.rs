//! Schema runner for the desk database.
//!
//! ```text
//! cargo run -p migration -- up | down [steps] | fresh | status
//! ```
//!
//! `DATABASE_URL` selects the database; it defaults to `cambista.db` in the
//! working directory, the same file the admin CLI opens.

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./cambista.db?mode=rwc";
const USAGE: &str = "usage: migration [up | down [steps] | fresh | status]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let db = Database::connect(&database_url).await?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["up"] => migration::Migrator::up(&db, None).await?,
        // Rolls back a single migration unless told otherwise.
        ["down"] => migration::Migrator::down(&db, Some(1)).await?,
        ["down", steps] => {
            let steps: u32 = steps.parse().map_err(|_| format!("invalid steps `{steps}`"))?;
            migration::Migrator::down(&db, Some(steps)).await?;
        }
        ["fresh"] => migration::Migrator::fresh(&db).await?,
        ["status"] => migration::Migrator::status(&db).await?,
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

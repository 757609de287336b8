//! # Module purge utility
//!
//! Deletes every flashcard module from the database named by `DB_PATH` and prints how many were
//! removed. Users are left alone. There is no confirmation prompt.

use std::{path::PathBuf, process::ExitCode};

use flashdeck_server::{
    config::{defaults, vars},
    db::{clients::sqlite::SqliteClient, interface::ModuleRepository},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let db_path = std::env::var_os(vars::DB_PATH)
        .map_or_else(|| PathBuf::from(defaults::DB_PATH), PathBuf::from);

    let db = match SqliteClient::open(&db_path).await {
        Ok(db) => db,
        Err(err) => {
            error!("failed to open database {}: {err}", db_path.display());
            return ExitCode::FAILURE;
        }
    };

    match db.delete_all_modules().await {
        Ok(count) => {
            println!("deleted {count} modules");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("failed to delete modules: {err}");
            ExitCode::FAILURE
        }
    }
}

use std::sync::Arc;

use altgen::completion::CompletionClient;
use altgen::config::setup_logging;
use clap::Parser;
use sea_orm_migration::MigratorTrait;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = altgen::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let db = match altgen::db::connect_db(&cli.database_path).await {
        Ok(db) => db,
        Err(err) => {
            error!("Database connection error: {}", err);
            return;
        }
    };

    if let Err(err) = altgen::db::migrations::Migrator::up(&db, None).await {
        error!("Database migration error: {}", err);
        return;
    }

    let client = match CompletionClient::new(cli.completions_url.clone()) {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to build HTTP client: {}", err);
            return;
        }
    };

    if let Err(err) = altgen::web::setup_server(
        &cli.listen_address,
        cli.port,
        cli.public_url,
        cli.upload_dir,
        db,
        Arc::new(client),
    )
    .await
    {
        error!("Application error: {}", err);
    }
}

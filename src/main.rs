use std::path::PathBuf;

use benchtab::{
    config::{AppConfig, SetupError, create_app, make_pool, run_migrations},
    state::with_conn,
    tournaments::standings::compute::standings_of_event,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Scores and ranks head-to-head debate tournaments")]
struct Cli {
    /// A TOML file with `database_url` and `bind_addr`.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply migrations, then serve the HTTP API.
    Serve,
    /// Apply pending migrations and exit.
    Migrate,
    /// Print the standings (and trace) of an event as JSON.
    Standings { event_id: String },
}

#[tokio::main]
async fn main() -> Result<(), SetupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let pool = make_pool(&config.database_url)?;

    match cli.command {
        Command::Serve => {
            run_migrations(&pool)?;
            let listener =
                tokio::net::TcpListener::bind(&config.bind_addr).await?;
            tracing::info!("listening on {}", config.bind_addr);
            axum::serve(listener, create_app(pool)).await?;
        }
        Command::Migrate => run_migrations(&pool)?,
        Command::Standings { event_id } => {
            let report = with_conn(&pool, move |conn| {
                standings_of_event(&event_id, conn)
            })
            .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

mod app;
mod appstate;
mod auth;
mod blog;
mod config;
mod db;
mod known_errors;
mod notfoundpage;
mod theme;

use clap::Parser;
use clap::Subcommand;
use dotenvy::dotenv;
use std::env;

use crate::config::Config;
use crate::known_errors::AppError;

#[derive(Parser)]
#[command(version, about = "A tiny blog with username and password accounts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (the default).
    Serve,
    /// Clear the existing data and create new tables.
    InitDb,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        unsafe {
            // Concurrent writing of set_var is not permitted,
            // but we're in main, so that shouldn't be a problem.
            env::set_var("RUST_LOG", "INFO");
        }
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::InitDb => init_db_command(config).await,
    }
}

async fn serve(config: Config) -> Result<(), AppError> {
    let addr = config.bind_addr.clone();
    let app = app::create_app(Some(config)).await?;

    tracing::info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn init_db_command(config: Config) -> Result<(), AppError> {
    app::ensure_instance_folder(&config.instance_path)?;

    let pool = db::connect(&config.database);
    db::init_db(&pool).await?;
    pool.close().await;

    println!("Initialized the database.");
    Ok(())
}

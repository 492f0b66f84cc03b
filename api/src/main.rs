mod config;
mod database;
mod notifications;
mod openapi;
mod request_logging;
mod validation;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use database::Database;
use notifications::MessageNotifier;
use poem::{
    handler, listener::TcpListener, middleware::Cors, web::Redirect, Endpoint, EndpointExt, Route,
    Server,
};
use poem_openapi::OpenApiService;
use request_logging::RequestLogging;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "api-server")]
#[command(about = "Lingua school administration API server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve,
    /// Check configuration and database connectivity, then exit
    Doctor,
}

#[handler]
async fn root_redirect() -> Redirect {
    Redirect::temporary("/api/v1/docs")
}

/// Builds the full HTTP application around already constructed services.
fn build_app(
    config: Arc<AppConfig>,
    database: Arc<Database>,
    notifier: Arc<MessageNotifier>,
) -> impl Endpoint {
    let api_service = OpenApiService::new(
        openapi::create_combined_api(),
        "Lingua School API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(format!("http://localhost:{}/api/v1", config.port));
    let swagger_ui = api_service.swagger_ui();
    let spec = api_service.spec_endpoint();

    Route::new()
        .at("/", poem::get(root_redirect))
        .at("/api/v1/openapi.json", spec)
        .nest("/api/v1/docs", swagger_ui)
        .nest("/api/v1", api_service)
        .data(config)
        .data(database)
        .data(notifier)
        .with(Cors::new())
        .with(RequestLogging)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if it exists
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve => serve_command(config).await,
        Commands::Doctor => doctor_command(config).await,
    }
}

async fn serve_command(config: AppConfig) -> Result<()> {
    let database = Arc::new(Database::new(&config.database_url).await?);
    tracing::info!("Database initialized at {}", config.database_url);

    let notifier = match &config.email {
        Some(email) => MessageNotifier::new(email),
        None => {
            tracing::warn!("Email is not configured; message notifications are disabled");
            MessageNotifier::disabled()
        }
    };

    let addr = config.listen_addr();
    tracing::info!(
        environment = %config.environment,
        "Starting Lingua API server on {}",
        addr
    );

    let app = build_app(Arc::new(config), database, Arc::new(notifier));
    Server::new(TcpListener::bind(&addr))
        .run(app)
        .await
        .context("HTTP server failed")
}

async fn doctor_command(config: AppConfig) -> Result<()> {
    println!("Environment:   {}", config.environment);
    println!("Listen addr:   {}", config.listen_addr());
    println!("Database URL:  {}", config.database_url);
    match &config.email {
        Some(email) => println!("Email:         enabled via {} (from {})", email.api_url, email.from),
        None => println!("Email:         disabled (set EMAIL_API_KEY and EMAIL_FROM)"),
    }

    let database = Database::new(&config.database_url).await?;
    if database.check_schema_applied().await? {
        println!("Schema:        OK");
        Ok(())
    } else {
        anyhow::bail!("Database schema is incomplete at {}", config.database_url)
    }
}

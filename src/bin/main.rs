use anyhow::Result;
use clap::{Parser, Subcommand};
use issuehub::{AppConfig, DatabaseConfig, create_app};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "issuehub")]
#[command(about = "Multi-project issue tracker API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Server {
        /// Bind address, e.g. 0.0.0.0:8000
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
        #[arg(long, default_value = "memory")]
        db_url: String,
        /// HS256 signing secret for access tokens
        #[arg(long, env = "SECRET_KEY")]
        secret_key: Option<String>,
        /// Access token lifetime in minutes
        #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES")]
        token_ttl_minutes: Option<i64>,
    },
    /// Initialize the database
    Init {
        #[arg(long, default_value = "memory")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("issuehub=info".parse()?)
                .add_directive("surrealdb=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            bind,
            db_url,
            secret_key,
            token_ttl_minutes,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for API server: {}", db_config.url);

            let mut config = AppConfig::default();
            if let Some(secret_key) = secret_key {
                config.secret_key = secret_key;
            }
            if let Some(minutes) = token_ttl_minutes {
                config.access_token_expire_minutes = minutes;
            }

            info!(
                "Starting {} on {} (prefix {}, tokens valid {} min)",
                config.project_name,
                bind,
                config.normalized_prefix(),
                config.access_token_expire_minutes
            );

            let app = create_app(db_config, config).await?;
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Server listening on http://{}", bind);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = issuehub::create_connection(db_config).await?;
            issuehub::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
    }

    Ok(())
}

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use bastion::{
    AlertConfig, BastionBuilder, JwtConfig, Principal, SecretEncoding, ThrottleConfig,
    bastion_core::{crypto::hash_secret, validation::validate_username},
    sqlite::SqliteStorage,
};
use chrono::Duration;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Command line interface for Bastion
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "BASTION_DATABASE_URL", default_value = "sqlite://bastion.db?mode=rwc")]
    database_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Serve the login API
    Serve(ServeArgs),
    /// Run database migrations
    Migrate,
    /// Create a user
    AddUser(AddUserArgs),
    /// Print version information
    Version,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "BASTION_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// HMAC key for signing tokens
    #[arg(long, env = "BASTION_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Issuer claim of signed tokens
    #[arg(long, env = "BASTION_JWT_ISSUER", default_value = "bastion")]
    jwt_issuer: String,

    /// Token lifetime in minutes
    #[arg(long, env = "BASTION_TOKEN_MINUTES", default_value_t = 1440)]
    token_minutes: i64,

    /// Consecutive failures before a username is blocked
    #[arg(long, env = "BASTION_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: u32,

    /// How long a blocked username stays blocked
    #[arg(long, env = "BASTION_LOCKOUT_SECONDS", default_value_t = 900)]
    lockout_seconds: i64,

    /// Turn off throttling and only verify credentials
    #[arg(long, env = "BASTION_DISABLE_THROTTLE")]
    disable_throttle: bool,

    /// Encoding of the secret field in login requests (plain or base64)
    #[arg(long, env = "BASTION_SECRET_ENCODING", default_value = "plain")]
    secret_encoding: SecretEncoding,
}

#[derive(clap::Args)]
struct AddUserArgs {
    /// Username, matched exactly on login
    username: String,

    /// Role to grant; repeat for several
    #[arg(long = "role", default_value = "USER")]
    roles: Vec<String>,

    /// Secret for the new user
    #[arg(long, env = "BASTION_USER_SECRET", hide_env_values = true)]
    secret: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(&cli.database_url, args).await?,
        Commands::Migrate => {
            tracing::info!("Running migrations");
            let storage = SqliteStorage::connect(&cli.database_url).await?;
            storage.migrate().await?;
        }
        Commands::AddUser(args) => {
            validate_username(&args.username)?;
            let storage = SqliteStorage::connect(&cli.database_url).await?;
            storage.migrate().await?;

            let principal = Principal::new(args.username, args.roles);
            storage
                .user_directory()
                .create_user(&principal, &hash_secret(&args.secret))
                .await?;
            tracing::info!(username = %principal.username(), roles = ?principal.roles(), "Created user");
        }
        Commands::Version => {
            println!("Bastion v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn serve(database_url: &str, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let throttle_config = if args.disable_throttle {
        ThrottleConfig::disabled()
    } else {
        ThrottleConfig::default()
            .with_max_failed_attempts(args.max_attempts)
            .with_lockout_period(Duration::seconds(args.lockout_seconds))
    };
    let jwt_config = JwtConfig::new_hs256(args.jwt_secret.into_bytes())
        .with_issuer(args.jwt_issuer)
        .with_lifetime(Duration::minutes(args.token_minutes));

    let bastion = BastionBuilder::new()
        .with_sqlite(database_url)
        .await?
        .apply_migrations(true)
        .with_throttle_config(throttle_config)
        .with_alert_config(AlertConfig::from_env()?)
        .with_jwt_config(jwt_config)
        .build()
        .await?;
    let bastion = Arc::new(bastion);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = bastion.start_sweeper(shutdown_rx);

    let app = Router::new().nest("/v1", bastion.router(args.secret_encoding));

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!(address = %args.listen, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    bastion.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

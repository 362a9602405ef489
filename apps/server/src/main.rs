use anyhow::Context;
use clap::{Parser, Subcommand};
use dreamink_backend_api::{build_router, AppState};
use dreamink_backend_runtime::{shutdown_signal, telemetry, BackendServices};
use dreamink_config::load as load_config;
use dreamink_stylize::{StyleCatalog, SKETCH_STYLE};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "dreamink-backend")]
#[command(about = "DreamInk backend (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Create the database and apply migrations
    InitDb,
    /// Print registered accounts
    ListUsers,
    /// Print the configured style catalogue
    Styles,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::InitDb => init_db().await,
        Commands::ListUsers => list_users().await,
        Commands::Styles => list_styles(),
    }
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting DreamInk backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(services.authenticator.clone(), services.stylizer.clone())
        .with_max_upload_bytes(config.http.max_upload_bytes);
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    services.db_pool.close().await;
    info!("backend shut down");
    Ok(())
}

async fn init_db() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    let pool = dreamink_database::initialize_database(&config.database)
        .await
        .context("failed to initialise database")?;
    pool.close().await;

    println!("Database ready at {}", config.database.url);
    Ok(())
}

async fn list_users() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let users = services
        .authenticator
        .list_users()
        .await
        .context("failed to fetch users")?;

    println!("=== USERS ===");
    if users.is_empty() {
        println!("No users found in database");
    } else {
        println!("Found {} users:", users.len());
        println!(
            "{:<6} {:<20} {:<20} {:<36} {:<25}",
            "ID", "First Name", "Last Name", "Email", "Created At"
        );
        println!("{}", "-".repeat(110));

        for user in users {
            println!(
                "{:<6} {:<20} {:<20} {:<36} {:<25}",
                user.id,
                user.first_name,
                user.last_name,
                user.email,
                user.created_at.to_rfc3339()
            );
        }
    }

    services.db_pool.close().await;
    Ok(())
}

fn list_styles() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    let catalog = StyleCatalog::from_config(&config.stylize);

    println!("=== STYLES ===");
    println!("{:<12} {:<36} {}", "Style", "Model", "Prompt");
    println!("{}", "-".repeat(100));
    println!("{:<12} {:<36} {}", SKETCH_STYLE, "(built-in filter)", "-");

    for style in catalog.diffusion_styles() {
        println!("{:<12} {:<36} {}", style.name, style.model_path, style.prompt);
    }

    println!();
    println!(
        "Runtime: {} (device {})",
        config.stylize.runtime.base_url, config.stylize.device
    );
    Ok(())
}

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vulnrepro::{cli, config, errors};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        built = env!("VULNREPRO_BUILD_DATE"),
        git = env!("VULNREPRO_GIT_HASH"),
        "vulnrepro starting"
    );

    let result = match cli.command {
        cli::Commands::Scan(args) => cli::scan::handle_scan(args).await,
        cli::Commands::Classify(args) => cli::classify::handle_classify(args).await,
        cli::Commands::Stop(args) => cli::stop::handle_stop(args).await,
        cli::Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), errors::ReproError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}

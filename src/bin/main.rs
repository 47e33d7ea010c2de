use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelmark::config::{Config, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "reelmark-server")]
#[command(about = "Bookmark server for a TMDB-backed movie and TV browser", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "reelmark.yaml")]
    config: String,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let default_filter = if args.debug {
        "reelmark=debug,tower_http=debug"
    } else {
        "reelmark=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match config.logformat {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!("Using config file: {}", args.config);

    if let Err(e) = reelmark::run(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

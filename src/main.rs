use dblog::{cli, config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Subscriber first so validation warnings are reported
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_new(config::log_filter()).unwrap_or_else(|_| EnvFilter::new("dblog=info")),
        )
        .init();

    let config = config::get_config();

    if let Err(e) = cli::parse_cli_commands(&config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

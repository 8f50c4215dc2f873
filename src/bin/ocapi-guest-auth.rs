use clap::arg;
use clap::command;
use clap::Parser;
use ocapi_guest_auth::app::App;
use ocapi_guest_auth::utils::config_loader;
use ocapi_guest_auth::utils::logging;
use ocapi_guest_auth::utils::shutdown;
use anyhow::Result;
use ocapi_guest_auth::utils::logging::LogLevel;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "ocapi-guest-auth.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL" , value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Build shared collaborators once
    // -------------------------------

    let app = App::build(service_config)?;

    // -------------------------------
    // 3. Warm up the guest token, not fatal
    // -------------------------------

    if !app.auth.check_authentication().await {
        warn!("initial guest token fetch failed, will retry on demand");
    }

    // -------------------------------
    // 4. Serve until Ctrl-C
    // -------------------------------

    info!("Service starting...");
    app.run(shutdown::ctrl_c()).await
}

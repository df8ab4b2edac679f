use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use proxysub::interfaces::build_and_write_yaml;
use proxysub::models::AppState;
use proxysub::settings::init_settings;
use proxysub::utils::file::file_exists;
use proxysub::web_handlers::interfaces;
use proxysub::Settings;

/// Generate Clash subscriptions from a template and a small override file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML or YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (e.g., 127.0.0.1 or 0.0.0.0)
    #[arg(short, long, value_name = "ADDRESS")]
    address: Option<String>,

    /// Listen port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u32>,

    /// Template configuration file
    #[arg(long, value_name = "FILE")]
    template: Option<String>,

    /// Override file with proxies and providers
    #[arg(long, value_name = "FILE")]
    subs: Option<String>,

    /// Build once into this file and exit instead of serving
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,

    /// Fetch subscription URLs and add their proxies to the build
    #[arg(long)]
    fetch: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    init_settings(args.config.as_deref().unwrap_or(""))
        .map_err(|e| anyhow!("Failed to load settings: {}", e))?;

    // Command line arguments take precedence over the settings file
    {
        let mut settings_guard = Settings::current_mut();
        let settings = Arc::make_mut(&mut *settings_guard);
        if let Some(address) = args.address {
            settings.listen_address = address;
        }
        if let Some(port) = args.port {
            settings.listen_port = port;
        }
        if let Some(template) = args.template {
            settings.template_path = template;
        }
        if let Some(subs) = args.subs {
            settings.subs_path = subs;
        }
        if args.fetch {
            settings.fetch_subscriptions = true;
        }
    }

    let settings = Settings::current();
    if !file_exists(&settings.template_path) {
        warn!("Template {} does not exist yet", settings.template_path);
    }

    if let Some(output) = args.output {
        info!(
            "Building {} + {} into {}",
            settings.template_path, settings.subs_path, output
        );
        let options = settings.build_options();
        build_and_write_yaml(&settings.template_path, &settings.subs_path, &output, &options)
            .with_context(|| format!("Failed to build {}", output))?;
        return Ok(());
    }

    actix_web::rt::System::new().block_on(serve(settings))
}

async fn serve(settings: Arc<Settings>) -> anyhow::Result<()> {
    let listen_address = settings.bind_address();
    let app_state = Arc::new(AppState::from_settings());

    info!("proxysub starting on {}", listen_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&app_state)))
            .configure(interfaces::config)
    })
    .bind(&listen_address)
    .with_context(|| format!("Failed to bind {}", listen_address))?
    .workers(settings.max_concur_threads)
    .run()
    .await?;
    Ok(())
}

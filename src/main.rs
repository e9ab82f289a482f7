use actix_web::{middleware::Compress, web, App, HttpServer};
use anyhow::Context;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use quire::{config, AppState, SecurityHeaders, Settings};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            eprintln!("Please copy .env.example to .env and configure it");
            std::process::exit(1);
        }
    };

    info!("Bootstrapping quire");
    info!("Backend: {}", settings.backend_url);
    info!("Editor scripts from: {}", settings.editor_cdn);
    if !settings.main_admin.is_configured() {
        warn!("QUIRE_MAIN_ADMIN_ID not set: no admin will be shown main-admin controls");
    }

    let state = AppState::new(settings.clone()).context("loading page templates")?;
    let security = SecurityHeaders::from_settings(&settings);
    let bind = (settings.bind.clone(), settings.port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .app_data(web::Data::new(state.clone()))
            .configure(config)
    })
    .bind(bind.clone())
    .with_context(|| format!("binding {}:{}", bind.0, bind.1))?;

    info!("Listening on http://{}:{}", bind.0, bind.1);

    server.run().await?;
    Ok(())
}

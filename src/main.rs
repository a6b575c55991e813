use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use blotter::config::Settings;
use blotter::repo::sqlite::SqliteRepo;
use blotter::storage::FsImageStore;
use blotter::{config, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; production gets its environment from outside.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = Settings::from_env()?;
    info!(
        database = %settings.database_url,
        image_dir = %settings.image_dir.display(),
        max_upload_bytes = settings.max_upload_bytes,
        "Bootstrapping blotter"
    );

    // schema and image directory exist before the first request
    let repo = SqliteRepo::connect(&settings.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open database {}: {e}", settings.database_url))?;
    info!("Database schema ready");

    let image_store = FsImageStore::new(&settings.image_dir);
    image_store
        .ensure_dir()
        .await
        .map_err(|e| anyhow::anyhow!("failed to prepare image directory: {e}"))?;

    let state = AppState::new(Arc::new(repo), Arc::new(image_store))?
        .with_max_upload_bytes(settings.max_upload_bytes);
    let security = SecurityHeaders::from_env();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .app_data(web::Data::new(state.clone()))
            .configure(config)
    })
    .bind(&settings.bind_addr)?;

    info!("Listening on http://{}", settings.bind_addr);

    server.run().await?;
    Ok(())
}

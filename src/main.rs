use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Failures that stop the portal from starting or keep it from running.
#[derive(Debug, Error)]
enum Fatal {
    #[error("Server failed to ignite: {0}")]
    Ignite(#[source] RocketError),
    #[error("Server stopped unexpectedly: {0}")]
    Launch(#[source] RocketError),
}

async fn serve() -> Result<(), Fatal> {
    let rocket = community_backend::build()
        .ignite()
        .await
        .map_err(Fatal::Ignite)?;
    info!("Portal configured with {} routes", rocket.routes().count());

    // Request logging is done by our own fairing from here on.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    rocket.launch().await.map_err(Fatal::Launch)?;
    Ok(())
}

#[rocket::main]
async fn main() {
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Starting community portal");

    if let Err(err) = serve().await {
        error!("{err}");
        std::process::exit(1)
    }
}

use std::io;

use actix_web::web;
use dotenvy::dotenv;
use storefront_orders::{build_server, create_pool, run_migrations, AppConfig, AppState};

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup_error)?;

    let pool = create_pool(&config.database_url).map_err(startup_error)?;
    run_migrations(&pool).map_err(startup_error)?;

    let state = AppState::from_config(&config, pool).map_err(startup_error)?;

    log::info!(
        "Starting {} order service at http://{}:{}",
        config.store_name,
        config.host,
        config.port
    );

    build_server(web::Data::new(state), &config.host, config.port)?.await
}

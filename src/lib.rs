#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{AwsFairing, ConfigFairing, DatabaseFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notify;

pub use config::Config;

/// Build the server: configuration, database and SMS connections, request
/// logging, and all routes.
pub fn build() -> Rocket<Build> {
    with_routes(rocket::build()).attach(DatabaseFairing)
}

fn with_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(AwsFairing)
        .mount("/", api::routes())
}

/// Connect to the test database server named by `db_uri` in `Rocket.toml`.
#[cfg(test)]
async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .unwrap();
    mongodb::Client::with_uri_str(db_uri).await.unwrap()
}

/// A fresh database name, so tests can run in parallel.
#[cfg(test)]
fn database() -> String {
    use rand::Rng;

    format!("test-{:016x}", rand::thread_rng().gen::<u64>())
}

/// The server, using the given database in place of the configured one.
#[cfg(test)]
async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    config::prepare_database(&db).await.unwrap();
    with_routes(rocket::build()).manage(client).manage(db)
}

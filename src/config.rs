use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sns::{
    config::{Credentials, Region},
    Client as SnsClient,
};
use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::Result;
use crate::model::{
    db::ensure_committee_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Portal settings, read from `Rocket.toml` and `ROCKET_*` environment
/// variables and kept in managed state.
#[derive(Deserialize)]
pub struct Config {
    auth_ttl: u32,
    #[serde(default = "enabled")]
    strict_vote_options: bool,
    #[serde(default = "enabled")]
    emergency_alerts: bool,
    jwt_secret: String,
}

fn enabled() -> bool {
    true
}

impl Config {
    /// How long a login lasts.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Key used to sign session tokens.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Whether votes must name one of the announcement's declared options.
    /// When false, undeclared options become free-form tally buckets.
    pub fn strict_vote_options(&self) -> bool {
        self.strict_vote_options
    }

    /// Whether emergency calls are relayed to committee phones by SMS.
    pub fn emergency_alerts(&self) -> bool {
        self.emergency_alerts
    }
}

/// Pull a config section out of the figment, reporting what went wrong.
fn section<T: DeserializeOwned>(rocket: &Rocket<Build>, name: &str) -> Option<T> {
    match rocket.figment().extract::<T>() {
        Ok(section) => Some(section),
        Err(e) => {
            error!("Failed to load {name} config");
            rocket::config::pretty_print_error(e);
            None
        }
    }
}

/// Loads [`Config`] into managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Portal config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = section::<Config>(&rocket, "portal") else {
            return Err(rocket);
        };
        info!(
            "Sessions last {}s, strict vote options {}, emergency SMS {}",
            config.auth_ttl, config.strict_vote_options, config.emergency_alerts
        );
        Ok(rocket.manage(config))
    }
}

#[derive(Deserialize)]
struct DbConfig {
    db_name: String,
    db_uri: String,
}

/// Connects to MongoDB, prepares the database, and manages both the
/// `Client` (for transactions) and the `Database`.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = section::<DbConfig>(&rocket, "database") else {
            return Err(rocket);
        };
        info!("Connecting to database {}...", config.db_name);
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);
        if let Err(e) = prepare_database(&db).await {
            error!("Failed to prepare database: {e}");
            return Err(rocket);
        }
        info!("...database ready");
        Ok(rocket.manage(client).manage(db))
    }
}

/// Ensure the required indexes exist and that there is at least one
/// committee account to administer the site with.
///
/// This operation is idempotent.
pub async fn prepare_database(db: &Database) -> Result<()> {
    ensure_indexes_exist(db).await?;
    ensure_committee_exists(&Coll::from_db(db)).await?;
    Ok(())
}

#[derive(Deserialize)]
struct AwsConfig {
    aws_region: String,
    aws_access_key_id: String,
    aws_secret_access_key: String,
}

impl AwsConfig {
    fn sns_client(self) -> SnsClient {
        let credentials = Credentials::new(
            self.aws_access_key_id,
            self.aws_secret_access_key,
            None,
            None,
            "rocket config",
        );
        let sdk_config = SdkConfig::builder()
            .region(Region::new(self.aws_region))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .behavior_version(BehaviorVersion::latest())
            .build();
        SnsClient::new(&sdk_config)
    }
}

/// Manages the SNS client used to text emergency alerts.
pub struct AwsFairing;

#[rocket::async_trait]
impl Fairing for AwsFairing {
    fn info(&self) -> Info {
        Info {
            name: "Amazon SNS",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = section::<AwsConfig>(&rocket, "AWS") else {
            return Err(rocket);
        };
        info!("SMS alerts go through SNS in {}", config.aws_region);
        let client = config.sns_client();
        Ok(rocket.manage(client))
    }
}

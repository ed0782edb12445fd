use std::ops::{Deref, DerefMut};

use argon2::{Config, Error as Argon2Error};
use chrono::{DateTime, Utc};
use log::warn;
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::{Phone, Role},
    mongodb::{Coll, Id},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Credentials of the committee account created when none exists.
pub const DEFAULT_COMMITTEE_EMAIL: &str = "committee@community.local";
pub const DEFAULT_COMMITTEE_PASSWORD: &str = "change-me-at-once";

/// Core account data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCore {
    /// Login name, always lower-case.
    pub email: String,
    /// Encoded argon2 hash; the password itself is never stored.
    pub password_hash: String,
    pub display_name: String,
    pub role: Role,
    pub phone: Option<Phone>,
    pub room: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ProfileCore {
    /// Create a new profile, hashing the given password.
    pub fn new(
        email: &str,
        password: &str,
        display_name: String,
        role: Role,
        phone: Option<Phone>,
        room: Option<String>,
    ) -> std::result::Result<Self, Argon2Error> {
        Ok(Self {
            email: normalise_email(email),
            password_hash: hash_password(password)?,
            display_name,
            role,
            phone,
            room,
            created_at: Utc::now(),
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A profile without an ID.
pub type NewProfile = ProfileCore;

/// A profile from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub profile: ProfileCore,
}

impl Deref for Profile {
    type Target = ProfileCore;

    fn deref(&self) -> &Self::Target {
        &self.profile
    }
}

impl DerefMut for Profile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.profile
    }
}

/// Emails are matched case-insensitively, so they are stored lower-case.
pub fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> std::result::Result<String, Argon2Error> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
}

/// Make sure someone can administer the site: if there is no committee
/// account, create the default one.
///
/// This operation is idempotent.
pub async fn ensure_committee_exists(profiles: &Coll<NewProfile>) -> Result<()> {
    let committee = doc! { "role": Role::Committee };
    if profiles.count_documents(committee, None).await? > 0 {
        return Ok(());
    }

    warn!(
        "No committee account exists, creating {} with the default password",
        DEFAULT_COMMITTEE_EMAIL
    );
    let profile = NewProfile::new(
        DEFAULT_COMMITTEE_EMAIL,
        DEFAULT_COMMITTEE_PASSWORD,
        "Management Committee".to_string(),
        Role::Committee,
        None,
        None,
    )?;
    profiles.insert_one(profile, None).await?;
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    pub const EXAMPLE_PASSWORD: &str = "correct horse battery";

    impl ProfileCore {
        /// A profile of the given role, with password [`EXAMPLE_PASSWORD`].
        pub fn example(role: Role) -> Self {
            let (email, name, room) = match role {
                Role::Resident => ("resident@example.com", "Rita Resident", Some("12F-3")),
                Role::Committee => ("chair@example.com", "Colin Chair", Some("1F-1")),
                Role::Vendor => ("fixit@example.com", "Fixit Ltd", None),
            };
            Self::new(
                email,
                EXAMPLE_PASSWORD,
                name.to_string(),
                role,
                Some(Phone::example()),
                room.map(str::to_string),
            )
            .unwrap()
        }
    }
}

#[cfg(test)]
pub use examples::EXAMPLE_PASSWORD;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{Phone, Role},
    db::{profile::MIN_PASSWORD_LENGTH, NewProfile},
};

/// Email and password, as submitted to the login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Everything needed to open an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<Phone>,
    #[serde(default)]
    pub room: Option<String>,
}

impl ProfileSpec {
    /// Validate the submitted fields and hash the password.
    pub fn into_profile(self) -> Result<NewProfile> {
        let email = self.email.trim();
        if !email.contains('@') {
            return Err(Error::bad_request(format!("Invalid email address: {email}")));
        }
        check_password(&self.password)?;
        let display_name = self.display_name.trim();
        if display_name.is_empty() {
            return Err(Error::bad_request("Display name cannot be blank"));
        }
        let room = self
            .room
            .map(|room| room.trim().to_string())
            .filter(|room| !room.is_empty());

        Ok(NewProfile::new(
            email,
            &self.password,
            display_name.to_string(),
            self.role,
            self.phone,
            room,
        )?)
    }
}

/// A request to change the caller's own password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current: String,
    pub new: String,
}

/// Reject passwords too short to be worth hashing.
pub fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::db::profile::EXAMPLE_PASSWORD;

    impl LoginRequest {
        /// Credentials matching `NewProfile::example(role)`.
        pub fn example(role: Role) -> Self {
            Self {
                email: NewProfile::example(role).email,
                password: EXAMPLE_PASSWORD.to_string(),
            }
        }
    }

    impl ProfileSpec {
        pub fn example(role: Role) -> Self {
            let profile = NewProfile::example(role);
            Self {
                email: profile.email,
                password: EXAMPLE_PASSWORD.to_string(),
                display_name: profile.display_name,
                role,
                phone: profile.phone,
                room: profile.room,
            }
        }

        pub fn example_neighbour() -> Self {
            Self {
                email: "Nina@Example.com".to_string(),
                password: "another long password".to_string(),
                display_name: "Nina Neighbour".to_string(),
                role: Role::Resident,
                phone: None,
                room: Some("12F-4".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use super::*;

    #[test]
    fn valid_spec_becomes_profile() {
        let profile = ProfileSpec::example_neighbour().into_profile().unwrap();
        assert_eq!(profile.email, "nina@example.com");
        assert_eq!(profile.role, Role::Resident);
        assert!(profile.verify_password("another long password"));
    }

    #[test]
    fn invalid_specs_rejected() {
        let mut spec = ProfileSpec::example_neighbour();
        spec.password = "short".to_string();
        assert_eq!(spec.into_profile().unwrap_err().status(), Status::BadRequest);

        let mut spec = ProfileSpec::example_neighbour();
        spec.email = "not an email".to_string();
        assert_eq!(spec.into_profile().unwrap_err().status(), Status::BadRequest);

        let mut spec = ProfileSpec::example_neighbour();
        spec.display_name = "   ".to_string();
        assert_eq!(spec.into_profile().unwrap_err().status(), Status::BadRequest);
    }

    #[test]
    fn blank_room_dropped() {
        let mut spec = ProfileSpec::example(Role::Vendor);
        spec.room = Some("  ".to_string());
        assert_eq!(spec.into_profile().unwrap().room, None);
    }
}

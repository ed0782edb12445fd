use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::{bson::doc, Database};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    common::Role,
    db::Profile,
    mongodb::{Coll, Id},
};

use super::audience::Audience;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// A signed session token for one profile, accepted only by endpoints whose
/// audience `A` admits the profile's role.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<A> {
    pub id: Id,
    pub email: String,
    #[serde(rename = "nam")]
    pub name: String,
    #[serde(rename = "rgt")]
    pub role: Role,
    #[serde(skip)]
    phantom: PhantomData<A>,
}

impl<A> AuthToken<A> {
    /// Create a token for the given profile.
    pub fn new(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            name: profile.display_name.clone(),
            role: profile.role,
            phantom: PhantomData,
        }
    }

    /// Is the bearer on the management committee?
    pub fn is_committee(&self) -> bool {
        self.role == Role::Committee
    }

    /// Sign this token and wrap it in a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>, Error> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Verify and decode a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<A>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<A> {
    #[serde(flatten, bound = "")]
    token: AuthToken<A>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, A> FromRequest<'r> for AuthToken<A>
where
    A: Audience + Send,
{
    type Error = Error;

    /// Decode the token from its cookie, check the profile still exists with
    /// the same role, then check the role belongs to the audience.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) else {
            return Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Not logged in"),
            ));
        };

        let token = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(_) => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Invalid or expired session"),
                ))
            }
        };

        // A deleted profile, or one whose role changed, invalidates the token.
        let db = req.guard::<&State<Database>>().await.unwrap();
        let filter = doc! {
            "_id": token.id,
            "role": token.role,
        };
        match Coll::<Profile>::from_db(db).count_documents(filter, None).await {
            Ok(0) => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Account no longer exists"),
                ))
            }
            Ok(_) => {}
            Err(e) => return Outcome::Failure((Status::InternalServerError, e.into())),
        }

        if !A::admits(token.role) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::forbidden(format!("Only for {}", A::DESCRIPTION)),
            ));
        }

        Outcome::Success(token)
    }
}

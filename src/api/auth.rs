use log::info;
use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::auth::{
            check_password, AuthToken, LoginRequest, Member, PasswordChange, ProfileSpec,
            SessionUser, AUTH_TOKEN_COOKIE,
        },
        common::Role,
        db::{
            profile::{hash_password, normalise_email},
            Profile,
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![login, register, me, change_password, logout]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginRequest>,
    profiles: Coll<Profile>,
    config: &State<Config>,
) -> Result<Json<SessionUser>> {
    let with_email = doc! {
        "email": normalise_email(&credentials.email),
    };

    // Same answer for an unknown email and a wrong password.
    let profile = profiles
        .find_one(with_email, None)
        .await?
        .filter(|profile| profile.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Incorrect email or password"))?;

    let token = AuthToken::<Member>::new(&profile);
    cookies.add(token.into_cookie(config)?);
    info!("{} logged in as {}", profile.email, profile.role);

    Ok(Json(profile.into()))
}

/// Self-service sign-up for residents and vendors.
#[post("/auth/register", data = "<spec>", format = "json")]
async fn register(spec: Json<ProfileSpec>, profiles: Coll<Profile>) -> Result<Json<SessionUser>> {
    if spec.role == Role::Committee {
        return Err(Error::forbidden(
            "Committee accounts can only be created by the committee",
        ));
    }
    let profile = create_profile(spec.0, &profiles).await?;
    Ok(Json(profile.into()))
}

/// Validate and insert a new profile, rejecting duplicate emails.
pub(crate) async fn create_profile(spec: ProfileSpec, profiles: &Coll<Profile>) -> Result<Profile> {
    let profile = Profile {
        id: Id::new(),
        profile: spec.into_profile()?,
    };
    match profiles.insert_one(&profile, None).await {
        Ok(_) => Ok(profile),
        Err(e) if is_duplicate_key_error(&e) => Err(Error::bad_request(format!(
            "Email already registered: {}",
            profile.email
        ))),
        Err(e) => Err(e.into()),
    }
}

#[get("/auth/me")]
async fn me(token: AuthToken<Member>, profiles: Coll<Profile>) -> Result<Json<SessionUser>> {
    let profile = profiles
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Profile {}", token.id)))?;
    Ok(Json(profile.into()))
}

#[put("/auth/password", data = "<change>", format = "json")]
async fn change_password(
    token: AuthToken<Member>,
    change: Json<PasswordChange>,
    profiles: Coll<Profile>,
) -> Result<()> {
    let profile = profiles
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Profile {}", token.id)))?;
    if !profile.verify_password(&change.current) {
        return Err(Error::unauthorized("Current password is incorrect"));
    }
    check_password(&change.new)?;

    let password_hash = hash_password(&change.new)?;
    let update = doc! {
        "$set": {
            "password_hash": password_hash,
        }
    };
    profiles.update_one(token.id.as_doc(), update, None).await?;
    info!("{} changed their password", profile.email);
    Ok(())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use crate::model::db::{profile::EXAMPLE_PASSWORD, NewProfile};

    use super::*;

    async fn session_user(client: &Client) -> (Status, Option<SessionUser>) {
        let response = client.get(uri!(me)).dispatch().await;
        let status = response.status();
        let user = response
            .into_string()
            .await
            .and_then(|body| serde_json::from_str(&body).ok());
        (status, user)
    }

    #[backend_test]
    async fn login_valid(client: Client, profiles: Coll<NewProfile>) {
        profiles
            .insert_one(NewProfile::example(Role::Resident), None)
            .await
            .unwrap();

        // Email matching is case-insensitive.
        let mut credentials = LoginRequest::example(Role::Resident);
        credentials.email = credentials.email.to_uppercase();
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let (status, user) = session_user(&client).await;
        assert_eq!(Status::Ok, status);
        let user = user.unwrap();
        assert_eq!(user.email, "resident@example.com");
        assert_eq!(user.role, Role::Resident);
        assert_eq!(user.room.as_deref(), Some("12F-3"));
    }

    #[backend_test]
    async fn login_invalid(client: Client, profiles: Coll<NewProfile>) {
        profiles
            .insert_one(NewProfile::example(Role::Resident), None)
            .await
            .unwrap();

        // Wrong password.
        let mut credentials = LoginRequest::example(Role::Resident);
        credentials.password = "not the password".to_string();
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        let wrong_password = response.into_string().await.unwrap();

        // Unknown email.
        let credentials = LoginRequest {
            email: "nobody@example.com".to_string(),
            password: EXAMPLE_PASSWORD.to_string(),
        };
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(wrong_password, response.into_string().await.unwrap());

        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
        let (status, _) = session_user(&client).await;
        assert_eq!(Status::Unauthorized, status);
    }

    #[backend_test]
    async fn register_then_login(client: Client, profiles: Coll<Profile>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(ProfileSpec::example_neighbour()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // The password is hashed, and the email lower-cased.
        let profile = profiles
            .find_one(doc! { "email": "nina@example.com" }, None)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(profile.password_hash, "another long password");
        assert!(profile.verify_password("another long password"));

        // Registering the same email again fails.
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(ProfileSpec::example_neighbour()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Registering doesn't log in.
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": "nina@example.com",
                    "password": "another long password",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test]
    async fn cannot_register_committee(client: Client, profiles: Coll<Profile>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(ProfileSpec::example(Role::Committee)).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let filter = doc! { "email": NewProfile::example(Role::Committee).email };
        assert_eq!(0, profiles.count_documents(filter, None).await.unwrap());
    }

    #[backend_test(vendor)]
    async fn change_password_and_logout(client: Client, profiles: Coll<Profile>) {
        // Wrong current password.
        let change = PasswordChange {
            current: "wrong password".to_string(),
            new: "a brand new password".to_string(),
        };
        let response = client
            .put(uri!(change_password))
            .header(ContentType::JSON)
            .body(json!(change).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        // New password too short.
        let change = PasswordChange {
            current: EXAMPLE_PASSWORD.to_string(),
            new: "short".to_string(),
        };
        let response = client
            .put(uri!(change_password))
            .header(ContentType::JSON)
            .body(json!(change).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Valid change.
        let change = PasswordChange {
            current: EXAMPLE_PASSWORD.to_string(),
            new: "a brand new password".to_string(),
        };
        let response = client
            .put(uri!(change_password))
            .header(ContentType::JSON)
            .body(json!(change).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let filter = doc! { "email": NewProfile::example(Role::Vendor).email };
        let profile = profiles.find_one(filter, None).await.unwrap().unwrap();
        assert!(profile.verify_password("a brand new password"));
        assert!(!profile.verify_password(EXAMPLE_PASSWORD));

        // Log out.
        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
        let (status, _) = session_user(&client).await;
        assert_eq!(Status::Unauthorized, status);
    }

    #[backend_test(resident)]
    async fn deleted_profile_loses_session(client: Client, profiles: Coll<Profile>) {
        let (status, _) = session_user(&client).await;
        assert_eq!(Status::Ok, status);

        let filter = doc! { "email": NewProfile::example(Role::Resident).email };
        profiles.delete_one(filter, None).await.unwrap();

        let (status, _) = session_user(&client).await;
        assert_eq!(Status::Unauthorized, status);
    }
}

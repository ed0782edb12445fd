use log::info;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::auth::{AuthToken, Committee, ProfileSpec, SessionUser},
        common::Role,
        db::Profile,
        mongodb::{Coll, Id},
    },
};

use super::auth::create_profile;

pub fn routes() -> Vec<Route> {
    routes![list_profiles, add_profile, delete_profile]
}

#[get("/profiles")]
async fn list_profiles(
    _token: AuthToken<Committee>,
    profiles: Coll<Profile>,
) -> Result<Json<Vec<SessionUser>>> {
    let list: Vec<Profile> = profiles.find(None, None).await?.try_collect().await?;
    Ok(Json(list.into_iter().map(SessionUser::from).collect()))
}

/// Create an account of any role, including committee.
#[post("/profiles", data = "<spec>", format = "json")]
async fn add_profile(
    token: AuthToken<Committee>,
    spec: Json<ProfileSpec>,
    profiles: Coll<Profile>,
) -> Result<Json<SessionUser>> {
    let profile = create_profile(spec.0, &profiles).await?;
    info!(
        "{} created {} account {}",
        token.email, profile.role, profile.email
    );
    Ok(Json(profile.into()))
}

#[delete("/profiles/<profile_id>")]
async fn delete_profile(
    token: AuthToken<Committee>,
    profile_id: Id,
    profiles: Coll<Profile>,
) -> Result<()> {
    let profile = profiles
        .find_one(profile_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Profile {profile_id}")))?;

    // Someone must be left to run the site.
    if profile.role == Role::Committee {
        let committee = profiles
            .count_documents(doc! { "role": Role::Committee }, None)
            .await?;
        if committee <= 1 {
            return Err(Error::Status(
                Status::UnprocessableEntity,
                "Cannot delete the last committee account".to_string(),
            ));
        }
    }

    profiles.delete_one(profile_id.as_doc(), None).await?;
    info!("{} deleted account {}", token.email, profile.email);
    Ok(())
}

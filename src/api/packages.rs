use log::info;
use mongodb::bson::{doc, Bson, DateTime, Document};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Committee, Member},
            registry::{PackageSpec, PackageView, Pickup},
        },
        db::{Package, Profile},
        mongodb::{Coll, Id},
    },
};

use super::common::{get_profile_from_token, newest_first};

pub fn routes() -> Vec<Route> {
    routes![list_packages, receive_package, pick_up]
}

/// Filter for packages still waiting at the front desk.
pub(crate) fn uncollected() -> Document {
    doc! { "picked_at": Bson::Null }
}

/// The committee sees every package; everyone else only their own room's.
#[get("/packages?<room>&<pending>")]
async fn list_packages(
    token: AuthToken<Member>,
    room: Option<&str>,
    pending: Option<bool>,
    packages: Coll<Package>,
    profiles: Coll<Profile>,
) -> Result<Json<Vec<PackageView>>> {
    let mut filter = match pending {
        Some(true) => uncollected(),
        Some(false) => doc! { "picked_at": { "$ne": Bson::Null } },
        None => doc! {},
    };
    if token.is_committee() {
        if let Some(room) = room {
            filter.insert("room", room);
        }
    } else {
        let profile = get_profile_from_token(&token, &profiles).await?;
        match profile.profile.room {
            Some(own_room) => filter.insert("room", own_room),
            None => return Ok(Json(vec![])),
        };
    }

    let list: Vec<Package> = packages
        .find(filter, newest_first("received_at", None))
        .await?
        .try_collect()
        .await?;
    Ok(Json(list.into_iter().map(PackageView::from).collect()))
}

#[post("/packages", data = "<spec>", format = "json")]
async fn receive_package(
    token: AuthToken<Committee>,
    spec: Json<PackageSpec>,
    packages: Coll<Package>,
) -> Result<Json<PackageView>> {
    let package = Package {
        id: Id::new(),
        package: spec.0.into_package()?,
    };
    packages.insert_one(&package, None).await?;
    info!(
        "{} logged {} package for {}",
        token.email, package.courier, package.room
    );
    Ok(Json(package.into()))
}

/// Record who collected a package. Picking up twice is rejected.
#[post("/packages/<package_id>/pickup", data = "<pickup>", format = "json")]
async fn pick_up(
    token: AuthToken<Committee>,
    package_id: Id,
    pickup: Json<Pickup>,
    packages: Coll<Package>,
) -> Result<Json<PackageView>> {
    let picker = pickup.0.picker.trim().to_string();
    if picker.is_empty() {
        return Err(Error::bad_request("Picker is required"));
    }

    let mut waiting = uncollected();
    waiting.insert("_id", package_id);
    let update = doc! {
        "$set": {
            "picked_at": DateTime::now(),
            "picker": &picker,
        }
    };
    let result = packages.update_one(waiting, update, None).await?;

    let package = packages
        .find_one(package_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Package {package_id}")))?;
    if result.modified_count == 0 {
        return Err(Error::bad_request(format!(
            "Package {package_id} was already collected by {}",
            package.picker
        )));
    }

    info!("{} handed package {package_id} to {picker}", token.email);
    Ok(Json(package.into()))
}

use log::info;
use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Committee},
            registry::{ResidentSpec, ResidentView},
        },
        db::Resident,
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_residents, add_resident, delete_resident]
}

#[get("/residents")]
async fn list_residents(
    _token: AuthToken<Committee>,
    residents: Coll<Resident>,
) -> Result<Json<Vec<ResidentView>>> {
    let by_room = FindOptions::builder()
        .sort(doc! { "room": 1, "name": 1 })
        .build();
    let list: Vec<Resident> = residents.find(None, by_room).await?.try_collect().await?;
    Ok(Json(list.into_iter().map(ResidentView::from).collect()))
}

#[post("/residents", data = "<spec>", format = "json")]
async fn add_resident(
    token: AuthToken<Committee>,
    spec: Json<ResidentSpec>,
    residents: Coll<Resident>,
) -> Result<Json<ResidentView>> {
    let resident = Resident {
        id: Id::new(),
        resident: spec.0.into_resident()?,
    };
    residents.insert_one(&resident, None).await?;
    info!(
        "{} registered {} in {}",
        token.email, resident.name, resident.room
    );
    Ok(Json(resident.into()))
}

#[delete("/residents/<resident_id>")]
async fn delete_resident(
    token: AuthToken<Committee>,
    resident_id: Id,
    residents: Coll<Resident>,
) -> Result<()> {
    let result = residents.delete_one(resident_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Resident {resident_id}")));
    }
    info!("{} removed resident {resident_id}", token.email);
    Ok(())
}

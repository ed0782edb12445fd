use log::info;
use mongodb::bson::{doc, Bson, DateTime};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Committee},
            registry::{VisitorSpec, VisitorView},
        },
        db::Visitor,
        mongodb::{Coll, Id},
    },
};

use super::common::newest_first;

pub fn routes() -> Vec<Route> {
    routes![list_visitors, check_in, check_out]
}

/// Filter for visitors still on site.
pub(crate) fn on_site() -> mongodb::bson::Document {
    doc! { "out": Bson::Null }
}

#[get("/visitors?<active>")]
async fn list_visitors(
    _token: AuthToken<Committee>,
    active: Option<bool>,
    visitors: Coll<Visitor>,
) -> Result<Json<Vec<VisitorView>>> {
    let filter = match active {
        Some(true) => on_site(),
        Some(false) => doc! { "out": { "$ne": Bson::Null } },
        None => doc! {},
    };
    let list: Vec<Visitor> = visitors
        .find(filter, newest_first("in", None))
        .await?
        .try_collect()
        .await?;
    Ok(Json(list.into_iter().map(VisitorView::from).collect()))
}

#[post("/visitors", data = "<spec>", format = "json")]
async fn check_in(
    token: AuthToken<Committee>,
    spec: Json<VisitorSpec>,
    visitors: Coll<Visitor>,
) -> Result<Json<VisitorView>> {
    let visitor = Visitor {
        id: Id::new(),
        visitor: spec.0.into_visitor()?,
    };
    visitors.insert_one(&visitor, None).await?;
    info!(
        "{} signed in {} visiting {}",
        token.email, visitor.name, visitor.room
    );
    Ok(Json(visitor.into()))
}

/// Record the visitor's departure. Checking out twice is rejected.
#[post("/visitors/<visitor_id>/checkout")]
async fn check_out(
    token: AuthToken<Committee>,
    visitor_id: Id,
    visitors: Coll<Visitor>,
) -> Result<Json<VisitorView>> {
    let mut still_here = on_site();
    still_here.insert("_id", visitor_id);
    let update = doc! {
        "$set": {
            "out": DateTime::now(),
        }
    };
    let result = visitors.update_one(still_here, update, None).await?;

    let visitor = visitors
        .find_one(visitor_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Visitor {visitor_id}")))?;
    if result.modified_count == 0 {
        return Err(Error::bad_request(format!(
            "Visitor {visitor_id} has already checked out"
        )));
    }

    info!("{} signed out visitor {visitor_id}", token.email);
    Ok(Json(visitor.into()))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use super::*;

    async fn list(client: &Client, active: Option<bool>) -> Vec<VisitorView> {
        let response = client.get(uri!(list_visitors(active))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[backend_test(committee)]
    async fn check_in_and_out(client: Client) {
        let response = client
            .post(uri!(check_in))
            .header(ContentType::JSON)
            .body(json!(VisitorSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let visitor: VisitorView =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(visitor.left_at, None);
        assert_eq!(list(&client, Some(true)).await.len(), 1);

        let response = client.post(uri!(check_out(*visitor.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let departed: VisitorView =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(departed.left_at.is_some());

        assert!(list(&client, Some(true)).await.is_empty());
        assert_eq!(list(&client, Some(false)).await.len(), 1);
        assert_eq!(list(&client, None).await.len(), 1);

        // Twice is an error, and so is a visitor who never came.
        let response = client.post(uri!(check_out(*visitor.id))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
        let response = client.post(uri!(check_out(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }
}

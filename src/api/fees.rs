use log::info;
use mongodb::{
    bson::{doc, DateTime},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Committee, Member},
            fee::{FeeSpec, FeeView, Payment},
        },
        db::{Fee, Profile},
        mongodb::{Coll, Id},
    },
};

use super::common::get_profile_from_token;

pub fn routes() -> Vec<Route> {
    routes![list_fees, create_fee, pay_fee, delete_fee]
}

/// The committee sees every fee and may filter by room. Everyone else only
/// sees the fees of their own room.
#[get("/fees?<room>&<paid>")]
async fn list_fees(
    token: AuthToken<Member>,
    room: Option<&str>,
    paid: Option<bool>,
    fees: Coll<Fee>,
    profiles: Coll<Profile>,
) -> Result<Json<Vec<FeeView>>> {
    let mut filter = doc! {};
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
    if let Some(paid) = paid {
        filter.insert("paid", paid);
    }

    let by_due_date = FindOptions::builder().sort(doc! { "due": 1 }).build();
    let list: Vec<Fee> = fees.find(filter, by_due_date).await?.try_collect().await?;
    Ok(Json(list.into_iter().map(FeeView::from).collect()))
}

#[post("/fees", data = "<spec>", format = "json")]
async fn create_fee(
    token: AuthToken<Committee>,
    spec: Json<FeeSpec>,
    fees: Coll<Fee>,
) -> Result<Json<FeeView>> {
    let fee = Fee {
        id: Id::new(),
        fee: spec.0.into_fee()?,
    };
    fees.insert_one(&fee, None).await?;
    info!(
        "{} charged {} to {} (fee {})",
        token.email, fee.amount, fee.room, fee.id
    );
    Ok(Json(fee.into()))
}

/// Mark a fee paid. Paying twice is rejected.
#[post("/fees/<fee_id>/pay", data = "<payment>", format = "json")]
async fn pay_fee(
    token: AuthToken<Committee>,
    fee_id: Id,
    payment: Option<Json<Payment>>,
    fees: Coll<Fee>,
) -> Result<Json<FeeView>> {
    let invoice = payment.and_then(|payment| payment.0.invoice);
    let mut update = doc! {
        "paid": true,
        "paid_at": DateTime::now(),
    };
    if let Some(invoice) = invoice {
        update.insert("invoice", invoice);
    }

    let unpaid = doc! {
        "_id": fee_id,
        "paid": false,
    };
    let result = fees.update_one(unpaid, doc! { "$set": update }, None).await?;
    let fee = fees
        .find_one(fee_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Fee {fee_id}")))?;
    if result.modified_count == 0 {
        return Err(Error::bad_request(format!("Fee {fee_id} is already paid")));
    }

    info!("{} recorded payment of fee {fee_id}", token.email);
    Ok(Json(fee.into()))
}

#[delete("/fees/<fee_id>")]
async fn delete_fee(token: AuthToken<Committee>, fee_id: Id, fees: Coll<Fee>) -> Result<()> {
    let result = fees.delete_one(fee_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Fee {fee_id}")));
    }
    info!("{} deleted fee {fee_id}", token.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use super::*;

    async fn charge(db: &Database, room: &str) -> Fee {
        let mut spec = FeeSpec::example();
        spec.room = room.to_string();
        let fee = Fee {
            id: Id::new(),
            fee: spec.into_fee().unwrap(),
        };
        Coll::<Fee>::from_db(db).insert_one(&fee, None).await.unwrap();
        fee
    }

    async fn list(client: &Client, room: Option<&str>, paid: Option<bool>) -> Vec<FeeView> {
        let response = client.get(uri!(list_fees(room, paid))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[backend_test(committee)]
    async fn create_and_pay(client: Client) {
        let response = client
            .post(uri!(create_fee))
            .header(ContentType::JSON)
            .body(json!(FeeSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let fee: FeeView = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(!fee.paid);

        // Pay with an invoice number.
        let response = client
            .post(uri!(pay_fee(*fee.id)))
            .header(ContentType::JSON)
            .body(json!({ "invoice": "INV-0042" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let paid: FeeView = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(paid.paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(paid.invoice, "INV-0042");

        // Paying twice is an error.
        let response = client
            .post(uri!(pay_fee(*fee.id)))
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // Unknown fee.
        let response = client
            .post(uri!(pay_fee(Id::new())))
            .header(ContentType::JSON)
            .body("{}")
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        assert_eq!(list(&client, None, Some(true)).await.len(), 1);
        assert_eq!(list(&client, None, Some(false)).await.len(), 0);
    }

    #[backend_test(committee)]
    async fn committee_sees_all_rooms(client: Client, db: Database) {
        charge(&db, "12F-3").await;
        charge(&db, "3F-1").await;

        assert_eq!(list(&client, None, None).await.len(), 2);
        let one_room = list(&client, Some("3F-1"), None).await;
        assert_eq!(one_room.len(), 1);
        assert_eq!(one_room[0].room, "3F-1");
    }

    #[backend_test(resident)]
    async fn residents_see_own_room(client: Client, db: Database) {
        charge(&db, "12F-3").await;
        charge(&db, "3F-1").await;

        // The room filter cannot widen what a resident sees.
        let own = list(&client, Some("3F-1"), None).await;
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].room, "12F-3");

        let response = client
            .post(uri!(create_fee))
            .header(ContentType::JSON)
            .body(json!(FeeSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(vendor)]
    async fn roomless_members_see_nothing(client: Client, db: Database) {
        charge(&db, "12F-3").await;
        assert!(list(&client, None, None).await.is_empty());
    }
}

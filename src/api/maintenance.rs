use log::info;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Committee, Member},
            ticket::{TicketSpec, TicketView},
        },
        common::TicketStatus,
        db::Ticket,
        mongodb::{Coll, Id},
    },
};

use super::common::{newest_first, search_filter};

pub fn routes() -> Vec<Route> {
    routes![list_tickets, create_ticket, modify_ticket, delete_ticket]
}

#[get("/maintenance?<status>&<search>")]
async fn list_tickets(
    _token: AuthToken<Member>,
    status: Option<TicketStatus>,
    search: Option<&str>,
    tickets: Coll<Ticket>,
) -> Result<Json<Vec<TicketView>>> {
    let mut filter = search_filter(&["equipment", "item", "note"], search);
    if let Some(status) = status {
        filter.insert("status", status);
    }
    let list: Vec<Ticket> = tickets
        .find(filter, newest_first("time", None))
        .await?
        .try_collect()
        .await?;
    Ok(Json(list.into_iter().map(TicketView::from).collect()))
}

/// Report a problem. Any member may do this, including vendors.
#[post("/maintenance", data = "<spec>", format = "json")]
async fn create_ticket(
    token: AuthToken<Member>,
    spec: Json<TicketSpec>,
    tickets: Coll<Ticket>,
) -> Result<Json<TicketView>> {
    let ticket = Ticket {
        id: Id::new(),
        ticket: spec.0.into_ticket(&token.email)?,
    };
    tickets.insert_one(&ticket, None).await?;
    info!(
        "{} opened ticket {} for {}",
        token.email, ticket.id, ticket.equipment
    );
    Ok(Json(ticket.into()))
}

#[put("/maintenance/<ticket_id>", data = "<spec>", format = "json")]
async fn modify_ticket(
    token: AuthToken<Committee>,
    ticket_id: Id,
    spec: Json<TicketSpec>,
    tickets: Coll<Ticket>,
) -> Result<Json<TicketView>> {
    let mut ticket = tickets
        .find_one(ticket_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Ticket {ticket_id}")))?;
    let previous = ticket.status;
    spec.0.apply_to(&mut ticket, &token.email)?;

    tickets
        .replace_one(ticket_id.as_doc(), &ticket, None)
        .await?;
    if ticket.status != previous {
        info!(
            "{} moved ticket {ticket_id} from {previous} to {}",
            token.email, ticket.status
        );
    }
    Ok(Json(ticket.into()))
}

#[delete("/maintenance/<ticket_id>")]
async fn delete_ticket(
    token: AuthToken<Committee>,
    ticket_id: Id,
    tickets: Coll<Ticket>,
) -> Result<()> {
    let result = tickets.delete_one(ticket_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Ticket {ticket_id}")));
    }
    info!("{} deleted ticket {ticket_id}", token.email);
    Ok(())
}

use log::info;
use mongodb::{
    bson::{doc, DateTime, Document},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Committee, Member},
            registry::{MeetingSpec, MeetingView},
        },
        db::Meeting,
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_meetings, create_meeting, delete_meeting]
}

/// Filter for meetings that haven't started yet.
pub(crate) fn upcoming() -> Document {
    doc! { "time": { "$gte": DateTime::now() } }
}

/// Upcoming meetings are listed soonest first, everything else most recent
/// first.
#[get("/meetings?<upcoming>")]
async fn list_meetings(
    _token: AuthToken<Member>,
    upcoming: Option<bool>,
    meetings: Coll<Meeting>,
) -> Result<Json<Vec<MeetingView>>> {
    let (filter, order) = if upcoming == Some(true) {
        (self::upcoming(), 1)
    } else {
        (doc! {}, -1)
    };
    let options = FindOptions::builder().sort(doc! { "time": order }).build();
    let list: Vec<Meeting> = meetings.find(filter, options).await?.try_collect().await?;
    Ok(Json(list.into_iter().map(MeetingView::from).collect()))
}

#[post("/meetings", data = "<spec>", format = "json")]
async fn create_meeting(
    token: AuthToken<Committee>,
    spec: Json<MeetingSpec>,
    meetings: Coll<Meeting>,
) -> Result<Json<MeetingView>> {
    let meeting = Meeting {
        id: Id::new(),
        meeting: spec.0.into_meeting()?,
    };
    meetings.insert_one(&meeting, None).await?;
    info!(
        "{} scheduled meeting {} at {}",
        token.email, meeting.topic, meeting.time
    );
    Ok(Json(meeting.into()))
}

#[delete("/meetings/<meeting_id>")]
async fn delete_meeting(
    token: AuthToken<Committee>,
    meeting_id: Id,
    meetings: Coll<Meeting>,
) -> Result<()> {
    let result = meetings.delete_one(meeting_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Meeting {meeting_id}")));
    }
    info!("{} cancelled meeting {meeting_id}", token.email);
    Ok(())
}

use aws_sdk_sns::Client as SnsClient;
use log::{error, info, warn};
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::Result,
    model::{
        api::{
            auth::{AuthToken, Household, Member},
            registry::{EmergencySpec, EmergencyView},
        },
        common::{Phone, Role},
        db::{Emergency, Profile},
        mongodb::{Coll, Id},
    },
    notify, Config,
};

use super::common::{get_profile_from_token, newest_first, page_limit};

pub fn routes() -> Vec<Route> {
    routes![list_emergencies, report_emergency]
}

#[get("/emergencies?<limit>")]
async fn list_emergencies(
    _token: AuthToken<Member>,
    limit: Option<u32>,
    emergencies: Coll<Emergency>,
) -> Result<Json<Vec<EmergencyView>>> {
    let list: Vec<Emergency> = emergencies
        .find(None, newest_first("time", page_limit(limit)?))
        .await?
        .try_collect()
        .await?;
    Ok(Json(list.into_iter().map(EmergencyView::from).collect()))
}

/// Record an emergency call and, if enabled, text every committee member
/// who has a phone number. Failed alerts never fail the report.
#[post("/emergencies", data = "<spec>", format = "json")]
async fn report_emergency(
    token: AuthToken<Household>,
    spec: Json<EmergencySpec>,
    emergencies: Coll<Emergency>,
    profiles: Coll<Profile>,
    config: &State<Config>,
    sns: &State<SnsClient>,
) -> Result<Json<EmergencyView>> {
    let emergency = Emergency {
        id: Id::new(),
        emergency: spec.0.into_emergency(&token.email)?,
    };
    emergencies.insert_one(&emergency, None).await?;
    warn!(
        "{} reported a {} emergency: {}",
        token.email, emergency.kind, emergency.note
    );

    if config.emergency_alerts() {
        alert_committee(&emergency, &token, &profiles, sns).await;
    } else {
        info!("Emergency alerts are disabled, not sending SMS");
    }

    Ok(Json(emergency.into()))
}

/// Text the committee about a recorded emergency, returning how many alerts
/// were sent. Lookup failures are logged; the emergency is already stored.
async fn alert_committee<A>(
    emergency: &Emergency,
    token: &AuthToken<A>,
    profiles: &Coll<Profile>,
    sns: &SnsClient,
) -> usize {
    let room = match get_profile_from_token(token, profiles).await {
        Ok(reporter) => reporter.profile.room,
        Err(e) => {
            warn!("Could not look up reporter {} for the alert: {e}", token.email);
            None
        }
    };
    let phones = match committee_phones(profiles).await {
        Ok(phones) => phones,
        Err(e) => {
            error!("Could not look up committee phones, no SMS sent: {e}");
            return 0;
        }
    };
    let message = notify::emergency_message(emergency, room.as_deref());
    notify::alert(sns, &phones, &message).await
}

async fn committee_phones(profiles: &Coll<Profile>) -> Result<Vec<Phone>> {
    let committee: Vec<Profile> = profiles
        .find(doc! { "role": Role::Committee }, None)
        .await?
        .try_collect()
        .await?;
    Ok(committee
        .into_iter()
        .filter_map(|profile| profile.profile.phone)
        .collect())
}

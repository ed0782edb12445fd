use chrono::{Duration, Utc};
use mongodb::bson::{doc, DateTime};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::{AuthToken, Committee, Member},
            registry::EmergencyView,
            stats::{recent_activity, CommitteeStats, MemberStats, RECENT_ACTIVITY_LIMIT},
        },
        common::TicketStatus,
        db::{Announcement, Emergency, Fee, Meeting, Package, Resident, Ticket, Visitor},
        mongodb::Coll,
    },
};

use super::{
    common::newest_first, meetings::upcoming, packages::uncollected, visitors::on_site,
};

/// Window for the committee's emergency count.
const EMERGENCY_WINDOW_DAYS: i64 = 30;

pub fn routes() -> Vec<Route> {
    routes![member_stats, committee_stats]
}

#[get("/stats")]
#[allow(clippy::too_many_arguments)]
async fn member_stats(
    _token: AuthToken<Member>,
    announcements: Coll<Announcement>,
    tickets: Coll<Ticket>,
    fees: Coll<Fee>,
    visitors: Coll<Visitor>,
    packages: Coll<Package>,
    meetings: Coll<Meeting>,
    emergencies: Coll<Emergency>,
) -> Result<Json<MemberStats>> {
    let recent: Vec<Emergency> = emergencies
        .find(None, newest_first("time", Some(RECENT_ACTIVITY_LIMIT as u32)))
        .await?
        .try_collect()
        .await?;

    Ok(Json(MemberStats {
        announcements: announcements.count_documents(None, None).await?,
        open_tickets: tickets
            .count_documents(doc! { "status": TicketStatus::Open }, None)
            .await?,
        unpaid_fees: fees.count_documents(doc! { "paid": false }, None).await?,
        active_visitors: visitors.count_documents(on_site(), None).await?,
        pending_packages: packages.count_documents(uncollected(), None).await?,
        upcoming_meetings: meetings.count_documents(upcoming(), None).await?,
        recent_emergencies: recent.into_iter().map(EmergencyView::from).collect(),
    }))
}

#[get("/admin/stats")]
#[allow(clippy::too_many_arguments)]
async fn committee_stats(
    _token: AuthToken<Committee>,
    residents: Coll<Resident>,
    announcements: Coll<Announcement>,
    tickets: Coll<Ticket>,
    fees: Coll<Fee>,
    visitors: Coll<Visitor>,
    meetings: Coll<Meeting>,
    emergencies: Coll<Emergency>,
) -> Result<Json<CommitteeStats>> {
    let paid: Vec<Fee> = fees
        .find(doc! { "paid": true }, None)
        .await?
        .try_collect()
        .await?;
    let revenue = paid.iter().map(|fee| fee.amount).sum::<f64>();

    let window_start = DateTime::from_chrono(Utc::now() - Duration::days(EMERGENCY_WINDOW_DAYS));
    let latest_emergencies: Vec<Emergency> = emergencies
        .find(None, newest_first("time", Some(3)))
        .await?
        .try_collect()
        .await?;
    let latest_tickets: Vec<Ticket> = tickets
        .find(None, newest_first("time", Some(2)))
        .await?
        .try_collect()
        .await?;

    Ok(Json(CommitteeStats {
        residents: residents.count_documents(None, None).await?,
        announcements: announcements.count_documents(None, None).await?,
        open_tickets: tickets
            .count_documents(doc! { "status": TicketStatus::Open }, None)
            .await?,
        revenue,
        unpaid_fees: fees.count_documents(doc! { "paid": false }, None).await?,
        active_visitors: visitors.count_documents(on_site(), None).await?,
        upcoming_meetings: meetings.count_documents(upcoming(), None).await?,
        emergencies: emergencies
            .count_documents(doc! { "time": { "$gte": window_start } }, None)
            .await?,
        recent_activity: recent_activity(&latest_emergencies, &latest_tickets),
    }))
}

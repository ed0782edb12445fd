use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::{Emergency, Ticket};

use super::registry::EmergencyView;

/// How many recent activities the committee dashboard shows.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Dashboard figures for any member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberStats {
    pub announcements: u64,
    pub open_tickets: u64,
    pub unpaid_fees: u64,
    pub active_visitors: u64,
    pub pending_packages: u64,
    pub upcoming_meetings: u64,
    pub recent_emergencies: Vec<EmergencyView>,
}

/// Dashboard figures for the committee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitteeStats {
    pub residents: u64,
    pub announcements: u64,
    pub open_tickets: u64,
    /// Sum of all paid fees.
    pub revenue: f64,
    pub unpaid_fees: u64,
    pub active_visitors: u64,
    pub upcoming_meetings: u64,
    /// Emergencies in the last 30 days.
    pub emergencies: u64,
    pub recent_activity: Vec<Activity>,
}

/// Something that recently happened, for the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Activity {
    Emergency { time: DateTime<Utc>, text: String },
    Ticket { time: DateTime<Utc>, text: String },
}

impl Activity {
    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Self::Emergency { time, .. } | Self::Ticket { time, .. } => *time,
        }
    }
}

impl From<&Emergency> for Activity {
    fn from(emergency: &Emergency) -> Self {
        Self::Emergency {
            time: emergency.time,
            text: format!("{} emergency reported: {}", emergency.kind, emergency.note),
        }
    }
}

impl From<&Ticket> for Activity {
    fn from(ticket: &Ticket) -> Self {
        Self::Ticket {
            time: ticket.time,
            text: format!("{}: {} ({})", ticket.equipment, ticket.item, ticket.status),
        }
    }
}

/// Merge the latest emergencies and tickets into one feed, newest first.
pub fn recent_activity(emergencies: &[Emergency], tickets: &[Ticket]) -> Vec<Activity> {
    let mut activity: Vec<Activity> = emergencies
        .iter()
        .map(Activity::from)
        .chain(tickets.iter().map(Activity::from))
        .collect();
    activity.sort_by_key(|item| std::cmp::Reverse(item.time()));
    activity.truncate(RECENT_ACTIVITY_LIMIT);
    activity
}

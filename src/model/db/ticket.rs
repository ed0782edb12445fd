use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::TicketStatus, mongodb::Id};

/// An entry in a ticket's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketLog {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub time: DateTime<Utc>,
    pub text: String,
    /// Email of whoever made the change.
    pub by: String,
}

impl TicketLog {
    pub fn now(text: impl Into<String>, by: &str) -> Self {
        Self {
            time: Utc::now(),
            text: text.into(),
            by: by.to_string(),
        }
    }
}

/// Core maintenance ticket data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCore {
    /// The piece of equipment concerned, e.g. "Lift B".
    pub equipment: String,
    /// What is wrong with it.
    pub item: String,
    /// When the ticket was opened.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub time: DateTime<Utc>,
    /// Contractor handling the job.
    pub handler: String,
    pub cost: f64,
    pub note: String,
    pub status: TicketStatus,
    /// Person responsible on the committee side.
    pub assignee: String,
    pub logs: Vec<TicketLog>,
}

impl TicketCore {
    /// Record a status change in the log, if there is one.
    /// Returns whether the status changed.
    pub fn transition(&mut self, status: TicketStatus, by: &str) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.logs
            .push(TicketLog::now(format!("Status changed to {status}"), by));
        true
    }
}

/// A ticket without an ID.
pub type NewTicket = TicketCore;

/// A ticket from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ticket: TicketCore,
}

impl Deref for Ticket {
    type Target = TicketCore;

    fn deref(&self) -> &Self::Target {
        &self.ticket
    }
}

impl DerefMut for Ticket {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ticket
    }
}

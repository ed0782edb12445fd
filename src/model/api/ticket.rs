use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::TicketStatus,
    db::{NewTicket, Ticket, TicketLog},
};

/// A maintenance request, as reported by a member or edited by the committee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSpec {
    pub equipment: String,
    pub item: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub assignee: String,
}

impl TicketSpec {
    fn check(&self) -> Result<()> {
        if self.equipment.trim().is_empty() || self.item.trim().is_empty() {
            return Err(Error::bad_request("Equipment and item are required"));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(Error::bad_request("Cost must be a non-negative amount"));
        }
        Ok(())
    }

    /// Open a new ticket reported by `by`.
    pub fn into_ticket(self, by: &str) -> Result<NewTicket> {
        self.check()?;
        Ok(NewTicket {
            equipment: self.equipment.trim().to_string(),
            item: self.item.trim().to_string(),
            time: Utc::now(),
            handler: self.handler,
            cost: self.cost,
            note: self.note,
            status: self.status,
            assignee: self.assignee,
            logs: vec![TicketLog::now("Ticket created", by)],
        })
    }

    /// Apply an edit by `by` to an existing ticket, logging any status change.
    pub fn apply_to(self, ticket: &mut NewTicket, by: &str) -> Result<()> {
        self.check()?;
        ticket.equipment = self.equipment.trim().to_string();
        ticket.item = self.item.trim().to_string();
        ticket.handler = self.handler;
        ticket.cost = self.cost;
        ticket.note = self.note;
        ticket.assignee = self.assignee;
        ticket.transition(self.status, by);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketView {
    pub id: ApiId,
    pub equipment: String,
    pub item: String,
    pub time: DateTime<Utc>,
    pub handler: String,
    pub cost: f64,
    pub note: String,
    pub status: TicketStatus,
    pub assignee: String,
    pub logs: Vec<LogEntry>,
}

/// A ticket history entry, with an RFC 3339 timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub text: String,
    pub by: String,
}

impl From<TicketLog> for LogEntry {
    fn from(log: TicketLog) -> Self {
        Self {
            time: log.time,
            text: log.text,
            by: log.by,
        }
    }
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        let core = ticket.ticket;
        Self {
            id: ticket.id.into(),
            equipment: core.equipment,
            item: core.item,
            time: core.time,
            handler: core.handler,
            cost: core.cost,
            note: core.note,
            status: core.status,
            assignee: core.assignee,
            logs: core.logs.into_iter().map(LogEntry::from).collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use super::*;

    #[test]
    fn new_ticket_is_logged() {
        let ticket = TicketSpec::example().into_ticket("rita@x.org").unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.logs.len(), 1);
        assert_eq!(ticket.logs[0].text, "Ticket created");
        assert_eq!(ticket.logs[0].by, "rita@x.org");
    }

    #[test]
    fn edit_logs_status_change_only() {
        let mut ticket = TicketSpec::example().into_ticket("rita@x.org").unwrap();

        let mut edit = TicketSpec::example();
        edit.handler = "Lifts R Us".to_string();
        edit.cost = 120.5;
        edit.clone().apply_to(&mut ticket, "chair@x.org").unwrap();
        assert_eq!(ticket.handler, "Lifts R Us");
        assert_eq!(ticket.logs.len(), 1);

        edit.status = TicketStatus::Closed;
        edit.apply_to(&mut ticket, "chair@x.org").unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert_eq!(ticket.logs.len(), 2);
        assert_eq!(ticket.logs[1].text, "Status changed to closed");
    }

    #[test]
    fn invalid_tickets_rejected() {
        let mut spec = TicketSpec::example();
        spec.item = String::new();
        assert_eq!(spec.into_ticket("a").unwrap_err().status(), Status::BadRequest);

        let mut spec = TicketSpec::example();
        spec.cost = -1.0;
        assert_eq!(spec.into_ticket("a").unwrap_err().status(), Status::BadRequest);
    }
}

use std::fmt::Display;

use mongodb::bson::{to_bson, Bson};
use rocket::{
    form::{self, FromFormField, ValueField},
    http::{
        impl_from_uri_param_identity,
        uri::{
            self,
            fmt::{Query, UriDisplay},
        },
    },
};
use serde::{Deserialize, Serialize};

/// Where a maintenance ticket is in its lifecycle. Any state may move to any
/// other; every change is recorded in the ticket's log.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Reported, not yet picked up.
    #[default]
    Open,
    /// Someone is working on it.
    Progress,
    /// Done.
    Closed,
}

impl Display for TicketStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Open => "open",
                Self::Progress => "in progress",
                Self::Closed => "closed",
            }
        )
    }
}

impl TicketStatus {
    /// The stored and query-string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Progress => "progress",
            Self::Closed => "closed",
        }
    }
}

impl From<TicketStatus> for Bson {
    fn from(status: TicketStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

impl<'v> FromFormField<'v> for TicketStatus {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        [Self::Open, Self::Progress, Self::Closed]
            .into_iter()
            .find(|status| status.as_str() == field.value)
            .ok_or_else(|| form::Error::validation("expected open, progress or closed").into())
    }
}

impl UriDisplay<Query> for TicketStatus {
    fn fmt(&self, f: &mut uri::fmt::Formatter<'_, Query>) -> std::fmt::Result {
        f.write_value(self.as_str())
    }
}

impl_from_uri_param_identity!([Query] TicketStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_matches_serde() {
        for status in [TicketStatus::Open, TicketStatus::Progress, TicketStatus::Closed] {
            assert_eq!(Bson::from(status), Bson::String(status.as_str().to_string()));
        }
        assert_eq!(<TicketStatus as Default>::default(), TicketStatus::Open);
        assert_eq!(TicketStatus::Progress.to_string(), "in progress");
    }
}

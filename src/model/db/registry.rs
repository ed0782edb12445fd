//! Logbook-style records kept by the committee: residents, visitors,
//! packages, meetings and emergency calls.

use std::ops::Deref;

use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, DateTime};
use serde::{Deserialize, Serialize};

use crate::model::{common::Role, mongodb::Id};

/// Implement `Deref` from a stored record to its core data.
macro_rules! deref_core {
    ($record:ty => $core:ty, $field:ident) => {
        impl Deref for $record {
            type Target = $core;

            fn deref(&self) -> &Self::Target {
                &self.$field
            }
        }
    };
}

/// An entry in the residents register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentCore {
    pub name: String,
    pub room: String,
    pub phone: String,
    pub email: String,
    pub role: Role,
}

pub type NewResident = ResidentCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub resident: ResidentCore,
}

deref_core!(Resident => ResidentCore, resident);

/// A visitor signed in at the front desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorCore {
    pub name: String,
    /// Room being visited.
    pub room: String,
    #[serde(rename = "in", with = "chrono_datetime_as_bson_datetime")]
    pub arrived_at: ChronoDateTime<Utc>,
    /// Unset while the visitor is still on site.
    #[serde(rename = "out")]
    pub left_at: Option<DateTime>,
}

pub type NewVisitor = VisitorCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visitor {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub visitor: VisitorCore,
}

deref_core!(Visitor => VisitorCore, visitor);

/// A delivery held at the front desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageCore {
    pub courier: String,
    pub tracking: String,
    /// Addressee's room.
    pub room: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub received_at: ChronoDateTime<Utc>,
    /// Unset until collected.
    pub picked_at: Option<DateTime>,
    /// Who collected it.
    pub picker: String,
    pub note: String,
}

pub type NewPackage = PackageCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub package: PackageCore,
}

deref_core!(Package => PackageCore, package);

/// A committee or general meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingCore {
    pub topic: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub time: ChronoDateTime<Utc>,
    pub location: String,
    pub notes: String,
    pub minutes_url: String,
}

pub type NewMeeting = MeetingCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub meeting: MeetingCore,
}

deref_core!(Meeting => MeetingCore, meeting);

/// An emergency call raised by a resident or committee member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyCore {
    /// What kind of help is needed, e.g. "fire" or "ambulance".
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub time: ChronoDateTime<Utc>,
    pub note: String,
    /// Email of the caller.
    pub by: String,
}

pub type NewEmergency = EmergencyCore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emergency {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub emergency: EmergencyCore,
}

deref_core!(Emergency => EmergencyCore, emergency);

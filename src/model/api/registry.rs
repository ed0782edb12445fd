//! Request and response types for the residents register, visitor and
//! package logbooks, meetings and emergency calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::Role,
    db::{
        Emergency, Meeting, NewEmergency, NewMeeting, NewPackage, NewResident, NewVisitor,
        Package, Resident, Visitor,
    },
};

/// Fail with `400` naming the first blank field.
fn require(fields: &[(&str, &str)]) -> Result<()> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(Error::bad_request(format!("{name} is required"))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentSpec {
    pub name: String,
    pub room: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Resident
}

impl ResidentSpec {
    pub fn into_resident(self) -> Result<NewResident> {
        require(&[("Name", self.name.as_str()), ("Room", self.room.as_str())])?;
        Ok(NewResident {
            name: self.name.trim().to_string(),
            room: self.room.trim().to_string(),
            phone: self.phone,
            email: self.email,
            role: self.role,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentView {
    pub id: ApiId,
    pub name: String,
    pub room: String,
    pub phone: String,
    pub email: String,
    pub role: Role,
}

impl From<Resident> for ResidentView {
    fn from(resident: Resident) -> Self {
        let core = resident.resident;
        Self {
            id: resident.id.into(),
            name: core.name,
            room: core.room,
            phone: core.phone,
            email: core.email,
            role: core.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorSpec {
    pub name: String,
    pub room: String,
}

impl VisitorSpec {
    /// Sign the visitor in now.
    pub fn into_visitor(self) -> Result<NewVisitor> {
        require(&[("Name", self.name.as_str()), ("Room", self.room.as_str())])?;
        Ok(NewVisitor {
            name: self.name.trim().to_string(),
            room: self.room.trim().to_string(),
            arrived_at: Utc::now(),
            left_at: None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorView {
    pub id: ApiId,
    pub name: String,
    pub room: String,
    #[serde(rename = "in")]
    pub arrived_at: DateTime<Utc>,
    #[serde(rename = "out")]
    pub left_at: Option<DateTime<Utc>>,
}

impl From<Visitor> for VisitorView {
    fn from(visitor: Visitor) -> Self {
        let core = visitor.visitor;
        Self {
            id: visitor.id.into(),
            name: core.name,
            room: core.room,
            arrived_at: core.arrived_at,
            left_at: core.left_at.map(|at| at.to_chrono()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSpec {
    pub courier: String,
    #[serde(default)]
    pub tracking: String,
    pub room: String,
    #[serde(default)]
    pub note: String,
}

impl PackageSpec {
    /// Log the package as received now.
    pub fn into_package(self) -> Result<NewPackage> {
        require(&[("Courier", self.courier.as_str()), ("Room", self.room.as_str())])?;
        Ok(NewPackage {
            courier: self.courier.trim().to_string(),
            tracking: self.tracking.trim().to_string(),
            room: self.room.trim().to_string(),
            received_at: Utc::now(),
            picked_at: None,
            picker: String::new(),
            note: self.note,
        })
    }
}

/// Who collected a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub picker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageView {
    pub id: ApiId,
    pub courier: String,
    pub tracking: String,
    pub room: String,
    pub received_at: DateTime<Utc>,
    pub picked_at: Option<DateTime<Utc>>,
    pub picker: String,
    pub note: String,
}

impl From<Package> for PackageView {
    fn from(package: Package) -> Self {
        let core = package.package;
        Self {
            id: package.id.into(),
            courier: core.courier,
            tracking: core.tracking,
            room: core.room,
            received_at: core.received_at,
            picked_at: core.picked_at.map(|at| at.to_chrono()),
            picker: core.picker,
            note: core.note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSpec {
    pub topic: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub minutes_url: String,
}

impl MeetingSpec {
    pub fn into_meeting(self) -> Result<NewMeeting> {
        require(&[("Topic", self.topic.as_str())])?;
        Ok(NewMeeting {
            topic: self.topic.trim().to_string(),
            time: self.time,
            location: self.location,
            notes: self.notes,
            minutes_url: self.minutes_url,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingView {
    pub id: ApiId,
    pub topic: String,
    pub time: DateTime<Utc>,
    pub location: String,
    pub notes: String,
    pub minutes_url: String,
}

impl From<Meeting> for MeetingView {
    fn from(meeting: Meeting) -> Self {
        let core = meeting.meeting;
        Self {
            id: meeting.id.into(),
            topic: core.topic,
            time: core.time,
            location: core.location,
            notes: core.notes,
            minutes_url: core.minutes_url,
        }
    }
}

/// An emergency call. The note is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencySpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl EmergencySpec {
    /// Record the call as made now by `by`.
    pub fn into_emergency(self, by: &str) -> Result<NewEmergency> {
        let kind = self.kind.trim();
        if kind.is_empty() {
            return Err(Error::bad_request("Emergency type is required"));
        }
        let note = self
            .note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty())
            .unwrap_or_else(|| format!("{kind} emergency call"));
        Ok(NewEmergency {
            kind: kind.to_string(),
            time: Utc::now(),
            note,
            by: by.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyView {
    pub id: ApiId,
    #[serde(rename = "type")]
    pub kind: String,
    pub time: DateTime<Utc>,
    pub note: String,
    pub by: String,
}

impl From<Emergency> for EmergencyView {
    fn from(emergency: Emergency) -> Self {
        let core = emergency.emergency;
        Self {
            id: emergency.id.into(),
            kind: core.kind,
            time: core.time,
            note: core.note,
            by: core.by,
        }
    }
}


#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use super::*;

    #[test]
    fn emergency_note_defaults() {
        let emergency = EmergencySpec::example().into_emergency("rita@x.org").unwrap();
        assert_eq!(emergency.kind, "fire");
        assert_eq!(emergency.note, "fire emergency call");
        assert_eq!(emergency.by, "rita@x.org");

        let spec = EmergencySpec {
            kind: " medical ".to_string(),
            note: Some("Fall in lobby".to_string()),
        };
        let emergency = spec.into_emergency("rita@x.org").unwrap();
        assert_eq!(emergency.kind, "medical");
        assert_eq!(emergency.note, "Fall in lobby");

        let spec = EmergencySpec {
            kind: "  ".to_string(),
            note: None,
        };
        assert_eq!(spec.into_emergency("a").unwrap_err().status(), Status::BadRequest);
    }

    #[test]
    fn required_fields() {
        let mut spec = VisitorSpec::example();
        spec.room = String::new();
        let err = spec.into_visitor().unwrap_err();
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(err.to_string(), "400 Bad Request: Room is required");

        let visitor = VisitorSpec::example().into_visitor().unwrap();
        assert_eq!(visitor.left_at, None);

        let package = PackageSpec::example().into_package().unwrap();
        assert_eq!(package.picked_at, None);
        assert_eq!(package.picker, "");
    }
}

use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, common::Role, db::Profile};

/// The logged-in user, as shown to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: ApiId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub room: Option<String>,
}

impl From<Profile> for SessionUser {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id.into(),
            phone: profile.phone.as_ref().map(|phone| phone.e164()),
            email: profile.profile.email,
            display_name: profile.profile.display_name,
            role: profile.profile.role,
            room: profile.profile.room,
        }
    }
}

use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
};

use crate::error::{Error, Result};
use crate::model::{
    api::auth::AuthToken,
    db::Profile,
    mongodb::Coll,
};

/// Largest page any list endpoint returns.
pub const MAX_LIMIT: u32 = 200;

/// Return the caller's profile, looked up via their token ID.
pub async fn get_profile_from_token<A>(
    token: &AuthToken<A>,
    profiles: &Coll<Profile>,
) -> Result<Profile> {
    profiles
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Profile {}", token.id)))
}

/// Sort by `field` descending, returning at most `limit` documents.
/// MongoDB reads a zero limit as "no limit", so zero is never passed on.
pub fn newest_first(field: &str, limit: Option<u32>) -> FindOptions {
    FindOptions::builder()
        .sort(doc! { field: -1 })
        .limit(
            limit
                .filter(|&limit| limit > 0)
                .map(|limit| i64::from(limit.min(MAX_LIMIT))),
        )
        .build()
}

/// Check a `?limit=` from the caller. Zero is rejected rather than being
/// taken to mean everything.
pub fn page_limit(limit: Option<u32>) -> Result<Option<u32>> {
    match limit {
        Some(0) => Err(Error::bad_request("Limit must be at least 1")),
        limit => Ok(limit),
    }
}

/// Case-insensitive substring match of `text` against any of `fields`.
/// Blank search text matches everything.
pub fn search_filter(fields: &[&str], text: Option<&str>) -> Document {
    let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) else {
        return doc! {};
    };
    let pattern = escape_regex(text);
    let any_of: Vec<Document> = fields
        .iter()
        .map(|field| doc! { *field: { "$regex": &pattern, "$options": "i" } })
        .collect();
    doc! { "$or": any_of }
}

/// Escape regex metacharacters so user input matches literally.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

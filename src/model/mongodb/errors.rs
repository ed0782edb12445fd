//! Server error codes the driver has no constants for.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

/// E11000: a unique index rejected the write.
pub const DUPLICATE_KEY: i32 = 11000;

/// Whether a single-document write (insert, update or upsert) failed because
/// it would have broken a unique index.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY
    )
}

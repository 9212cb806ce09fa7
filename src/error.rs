//! Error taxonomy for the entry lifecycle.
//!
//! Every variant is recoverable by the caller. Database errors are classified
//! on the way in so that constraint races surface as the same domain errors
//! the in-code checks produce.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;

/// Kind of record a `NotFound` refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Round,
    Entry,
    Sticker,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::Round => "round",
            Resource::Entry => "entry",
            Resource::Sticker => "sticker",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum EntryError {
    /// Edit or delete attempted after the round started
    RoundLocked { round_id: i32 },
    /// Submission attempted after the round ended
    RoundEnded { round_id: i32 },
    /// A populated entry already exists for this round and user
    DuplicateSubmission { round_id: i32, user_id: i32 },
    /// Sticker usage ceiling reached
    ResourceExhausted { sticker_id: i32, limit: i32 },
    NotFound(Resource, i32),
    /// Feed name that is neither `competition` nor `normal`
    UnknownFeed(String),
    /// Sticker is scoped to a different competition than the round
    StickerMismatch { sticker_id: i32, competition_id: i32 },
    InvalidContent(String),
    /// Optimistic conflict that persisted through every retry
    Conflict,
    Database(DbErr),
}

impl EntryError {
    /// Stable machine-readable code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EntryError::RoundLocked { .. } => "round_locked",
            EntryError::RoundEnded { .. } => "round_ended",
            EntryError::DuplicateSubmission { .. } => "duplicate_submission",
            EntryError::ResourceExhausted { .. } => "resource_exhausted",
            EntryError::NotFound(..) => "not_found",
            EntryError::UnknownFeed(_) => "unknown_feed",
            EntryError::StickerMismatch { .. } => "sticker_mismatch",
            EntryError::InvalidContent(_) => "invalid_content",
            EntryError::Conflict => "conflict",
            EntryError::Database(_) => "database",
        }
    }

    /// Whether the whole transaction may be re-run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EntryError::Conflict)
    }
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryError::RoundLocked { round_id } => {
                write!(f, "Round {} has started; entries are locked", round_id)
            }
            EntryError::RoundEnded { round_id } => {
                write!(f, "Round {} has ended; submissions are closed", round_id)
            }
            EntryError::DuplicateSubmission { round_id, user_id } => write!(
                f,
                "User {} already has a submission in round {}; edit it instead",
                user_id, round_id
            ),
            EntryError::ResourceExhausted { sticker_id, limit } => write!(
                f,
                "Sticker {} has reached its usage limit of {}",
                sticker_id, limit
            ),
            EntryError::NotFound(resource, id) => write!(f, "Unknown {} {}", resource, id),
            EntryError::UnknownFeed(name) => write!(f, "Unknown feed '{}'", name),
            EntryError::StickerMismatch {
                sticker_id,
                competition_id,
            } => write!(
                f,
                "Sticker {} is not available in competition {}",
                sticker_id, competition_id
            ),
            EntryError::InvalidContent(msg) => write!(f, "Invalid content: {}", msg),
            EntryError::Conflict => write!(f, "Concurrent update conflict; try again"),
            EntryError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for EntryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EntryError::Database(e) => Some(e),
            _ => None,
        }
    }
}

/// Name of the partial unique index guarding one submission per round and user.
pub const ENTRY_UNIQUE_INDEX: &str = "entries_round_user_submitted_idx";
/// Name of the partial unique index guarding one live usage per sticker and media.
pub const USAGE_UNIQUE_INDEX: &str = "sticker_usages_live_media_idx";

impl From<DbErr> for EntryError {
    fn from(e: DbErr) -> Self {
        let msg = e.to_string();

        if is_unique_violation(&msg) {
            // SQLite names the columns, PostgreSQL names the index
            if msg.contains(ENTRY_UNIQUE_INDEX) || msg.contains("entries.round_id") {
                return EntryError::DuplicateSubmission {
                    round_id: 0,
                    user_id: 0,
                };
            }
            if msg.contains(USAGE_UNIQUE_INDEX) || msg.contains("sticker_usages.sticker_id") {
                return EntryError::Conflict;
            }
        }

        if is_transient(&msg) {
            return EntryError::Conflict;
        }

        EntryError::Database(e)
    }
}

fn is_unique_violation(msg: &str) -> bool {
    msg.contains("duplicate key value") || msg.contains("UNIQUE constraint failed")
}

fn is_transient(msg: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "could not serialize access",
        "40001",
        "deadlock detected",
        "database is locked",
        "database table is locked",
    ];
    MARKERS.iter().any(|m| msg.contains(m))
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ResponseError for EntryError {
    fn status_code(&self) -> StatusCode {
        match self {
            EntryError::RoundLocked { .. } => StatusCode::LOCKED,
            EntryError::RoundEnded { .. } => StatusCode::FORBIDDEN,
            EntryError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
            EntryError::ResourceExhausted { .. } => StatusCode::CONFLICT,
            EntryError::NotFound(..) | EntryError::UnknownFeed(_) => StatusCode::NOT_FOUND,
            EntryError::StickerMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EntryError::InvalidContent(_) => StatusCode::BAD_REQUEST,
            EntryError::Conflict => StatusCode::SERVICE_UNAVAILABLE,
            EntryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Never leak driver messages to clients
        let message = match self {
            EntryError::Database(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.code(),
            message,
        })
    }
}

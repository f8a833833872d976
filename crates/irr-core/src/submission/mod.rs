// # Submission Documents
//
// Change requests and the payload document built from them.

pub mod payload;
pub mod request;

pub use payload::{PAYLOAD_COMMENT, SubmissionPayload};
pub use request::{Action, ChangeRequest, ObjectType, identifier_from_rpsl};

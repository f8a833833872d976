// # Submission Payload
//
// Serializes a change request into the exact document the external
// dispatcher reads:
//
// ```text
// # MAKE SURE TO CHANGE THE DESIRED ACTION. OPTIONS ARE: add, modify, delete
// action: add
// password: secret            (only when a password is supplied)
// multiple_routes: true       (only for route/route6 with the flag set)
// route:      192.0.2.0/24
// ...
// ```
//
// Building is pure; the dispatcher owns writing and deleting the file.

use crate::error::{Error, Result};
use crate::submission::request::{Action, ChangeRequest};

/// Advisory comment opening every payload
pub const PAYLOAD_COMMENT: &str =
    "# MAKE SURE TO CHANGE THE DESIRED ACTION. OPTIONS ARE: add, modify, delete";

/// Serialized document handed to the external dispatcher
///
/// Built once per request and never reused.
#[derive(Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    action: Action,
    text: String,
}

impl SubmissionPayload {
    /// Build the payload for a change request
    ///
    /// # Errors
    ///
    /// `Error::Validation` when `object_text` is empty or blank.
    pub fn build(request: &ChangeRequest) -> Result<Self> {
        if request.object_text.trim().is_empty() {
            return Err(Error::validation("object_text is required"));
        }

        let mut text = String::with_capacity(request.object_text.len() + 128);
        text.push_str(PAYLOAD_COMMENT);
        text.push('\n');
        text.push_str("action: ");
        text.push_str(request.action.as_str());
        text.push('\n');

        if let Some(password) = request.first_password() {
            text.push_str("password: ");
            text.push_str(password);
            text.push('\n');
        }

        if request.multiple_routes
            && request.object_type.is_route()
            && request.action != Action::Delete
        {
            text.push_str("multiple_routes: true\n");
        }

        text.push_str(&request.object_text);

        Ok(Self {
            action: request.action,
            text,
        })
    }

    /// Action announced in the header
    pub fn action(&self) -> Action {
        self.action
    }

    /// Full document text
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Full document bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

// The payload embeds a password, keep it out of logs.
impl std::fmt::Debug for SubmissionPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionPayload")
            .field("action", &self.action)
            .field("len", &self.text.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::request::ObjectType;

    const ROUTE: &str = "route:      192.0.2.0/24\norigin:     AS65000\nmnt-by:     MAINT-EXAMPLE\nsource:     ALTDB";

    #[test]
    fn test_minimal_payload() {
        let req = ChangeRequest::new(ObjectType::Route, Action::Add, ROUTE);
        let payload = SubmissionPayload::build(&req).unwrap();
        assert_eq!(
            payload.as_str(),
            format!("{}\naction: add\n{}", PAYLOAD_COMMENT, ROUTE)
        );
    }

    #[test]
    fn test_header_order_with_password_and_multiple_routes() {
        let req = ChangeRequest::new(ObjectType::Route, Action::Modify, ROUTE)
            .with_password("first")
            .with_password("second")
            .with_multiple_routes(true);
        let payload = SubmissionPayload::build(&req).unwrap();

        let lines: Vec<&str> = payload.as_str().lines().collect();
        assert_eq!(lines[0], PAYLOAD_COMMENT);
        assert_eq!(lines[1], "action: modify");
        assert_eq!(lines[2], "password: first");
        assert_eq!(lines[3], "multiple_routes: true");
        assert!(payload.as_str().ends_with(ROUTE));
        assert!(!payload.as_str().contains("second"));
    }

    #[test]
    fn test_false_flag_is_omitted() {
        let req = ChangeRequest::new(ObjectType::Route6, Action::Add, "route6: 2001:db8::/32");
        let payload = SubmissionPayload::build(&req).unwrap();
        assert!(!payload.as_str().contains("multiple_routes"));
        assert!(!payload.as_str().contains("password"));
    }

    #[test]
    fn test_flag_ignored_for_non_route_and_delete() {
        let req = ChangeRequest::new(ObjectType::AsSet, Action::Add, "as-set: AS-EXAMPLE")
            .with_multiple_routes(true);
        assert!(!SubmissionPayload::build(&req).unwrap().as_str().contains("multiple_routes"));

        let req = ChangeRequest::new(ObjectType::Route, Action::Delete, ROUTE)
            .with_multiple_routes(true);
        assert!(!SubmissionPayload::build(&req).unwrap().as_str().contains("multiple_routes"));
    }

    #[test]
    fn test_empty_password_is_omitted() {
        let req = ChangeRequest::new(ObjectType::Route, Action::Add, ROUTE).with_password("");
        assert!(!SubmissionPayload::build(&req).unwrap().as_str().contains("password"));
    }

    #[test]
    fn test_blank_object_text_is_rejected() {
        let req = ChangeRequest::new(ObjectType::Route, Action::Add, "  \n ");
        let err = SubmissionPayload::build(&req).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_debug_hides_password() {
        let req = ChangeRequest::new(ObjectType::Route, Action::Add, ROUTE).with_password("s3cret");
        let payload = SubmissionPayload::build(&req).unwrap();
        assert!(!format!("{:?}", payload).contains("s3cret"));
    }
}

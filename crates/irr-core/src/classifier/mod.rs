//! Outcome classification
//!
//! Turns the raw output of one dispatcher run into a typed
//! [`SubmissionOutcome`]. The dispatcher's exit code is not a reliable
//! success signal (a registry can reject every object and the tool still
//! exits 0), so classification layers text matching over stderr with
//! parsing of the JSON report the tool embeds in stdout.
//!
//! ## Precedence
//!
//! 1. launch failure, or stderr contains `not authoritative` → NotAuthoritative
//! 2. stderr contains `authentication failed` → AuthenticationFailure
//! 3. stderr contains `Authorisation` and (`must be authenticated` or `failed`)
//!    → AuthorizationFailure
//! 4. stderr contains `no such object` → NotFound
//! 5. any other unsuccessful exit → TransportError (raw stderr)
//! 6. exit 0: parse the report after `Response from server:`; no successes
//!    or any failure → PartialFailure (re-routed to AuthorizationFailure when
//!    the registry's message is an authorisation failure), else Success
//! 7. exit 0 with an unparseable report → Success (raw stdout as message)
//!
//! `Generated JSON file: <path>` is picked up from stdout on every branch.
//!
//! All functions here are pure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::submission_tool::{DispatchResult, ExitState};

/// Marker preceding the embedded JSON report in the tool's stdout
pub const RESPONSE_MARKER: &str = "Response from server:";

/// Marker preceding the path of the JSON file the tool generated
pub const GENERATED_FILE_MARKER: &str = "generated json file:";

const NOT_AUTHORITATIVE: &str = "not authoritative";
const AUTHENTICATION_FAILED: &str = "authentication failed";
const AUTHORISATION: &str = "Authorisation";
const MUST_BE_AUTHENTICATED: &str = "must be authenticated";
const FAILED: &str = "failed";
const NO_SUCH_OBJECT: &str = "no such object";

/// Message used when the report flags a failure without any error text
pub const DEFAULT_FAILURE_MESSAGE: &str = "RPSL object submission failed";

/// Message used for a clean run
pub const DEFAULT_SUCCESS_MESSAGE: &str = "RPSL object submitted successfully";

/// Closed set of classified outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    PartialFailure,
    AuthenticationFailure,
    AuthorizationFailure,
    NotAuthoritative,
    NotFound,
    TransportError,
}

impl OutcomeKind {
    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::PartialFailure => "partial_failure",
            OutcomeKind::AuthenticationFailure => "authentication_failure",
            OutcomeKind::AuthorizationFailure => "authorization_failure",
            OutcomeKind::NotAuthoritative => "not_authoritative",
            OutcomeKind::NotFound => "not_found",
            OutcomeKind::TransportError => "transport_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeKind::Success)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object counts reported by the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub successful: u64,
    pub failed: u64,
}

/// Classified result of one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// Outcome category
    pub kind: OutcomeKind,
    /// Human-readable message, usually the registry's own diagnostic
    pub message: String,
    /// Raw diagnostic text the message was taken from
    pub details: String,
    /// Path reported by `Generated JSON file:`
    pub generated_json_file: Option<String>,
    /// Object counts
    pub summary: Summary,
}

impl SubmissionOutcome {
    fn new(kind: OutcomeKind, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: details.into(),
            generated_json_file: None,
            summary: Summary::default(),
        }
    }

    /// Outcome for a dispatch that broke down before the tool produced output
    pub fn transport_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(OutcomeKind::TransportError, message.clone(), message)
    }
}

/// Registry report embedded in the tool's stdout
#[derive(Debug, Clone, Default, Deserialize)]
struct ServerReport {
    #[serde(default)]
    summary: ReportSummary,
    #[serde(default)]
    objects: Vec<ReportObject>,
}

/// Counts are optional: a report without them is not a failure
#[derive(Debug, Clone, Default, Deserialize)]
struct ReportSummary {
    successful: Option<u64>,
    failed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ReportObject {
    #[serde(default)]
    successful: bool,
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Classify one dispatcher run
pub fn classify(result: &DispatchResult) -> SubmissionOutcome {
    let mut outcome = classify_output(result);
    outcome.generated_json_file = generated_json_file(&result.stdout);
    outcome
}

fn classify_output(result: &DispatchResult) -> SubmissionOutcome {
    let stderr = result.stderr.as_str();

    if let ExitState::LaunchFailed(reason) = &result.exit {
        let message = format!("Dispatcher could not be started: {}", reason);
        return SubmissionOutcome::new(OutcomeKind::NotAuthoritative, message.clone(), message);
    }

    if stderr.contains(NOT_AUTHORITATIVE) {
        return SubmissionOutcome::new(
            OutcomeKind::NotAuthoritative,
            "Source is not authoritative for this object",
            stderr,
        );
    }

    if stderr.contains(AUTHENTICATION_FAILED) {
        return SubmissionOutcome::new(
            OutcomeKind::AuthenticationFailure,
            "Authentication failed",
            stderr,
        );
    }

    if is_authorisation_failure(stderr) {
        return SubmissionOutcome::new(
            OutcomeKind::AuthorizationFailure,
            "Authorization failed",
            stderr,
        );
    }

    if stderr.contains(NO_SUCH_OBJECT) {
        return SubmissionOutcome::new(OutcomeKind::NotFound, "Object not found", stderr);
    }

    if !result.exit.is_success() {
        let message = format!("Dispatcher failed ({})", result.exit);
        return SubmissionOutcome::new(OutcomeKind::TransportError, message, stderr);
    }

    classify_report(&result.stdout)
}

fn classify_report(stdout: &str) -> SubmissionOutcome {
    let report = match extract_report(stdout) {
        Some(Ok(report)) => report,
        Some(Err(e)) => {
            tracing::warn!("Unparseable server report, trusting exit status: {}", e);
            return lenient_success(stdout);
        }
        None => return lenient_success(stdout),
    };

    let summary = Summary {
        successful: report.summary.successful.unwrap_or_default(),
        failed: report.summary.failed.unwrap_or_default(),
    };

    let rejected = report.summary.successful == Some(0) || report.summary.failed.unwrap_or(0) > 0;
    if !rejected {
        let mut outcome =
            SubmissionOutcome::new(OutcomeKind::Success, DEFAULT_SUCCESS_MESSAGE, stdout);
        outcome.summary = summary;
        return outcome;
    }

    let message = report
        .objects
        .iter()
        .find(|o| !o.successful)
        .and_then(|o| o.error_messages.first())
        .cloned()
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

    let mut outcome = if is_authorisation_failure(&message) {
        SubmissionOutcome::new(OutcomeKind::AuthorizationFailure, message.clone(), message)
    } else {
        SubmissionOutcome::new(OutcomeKind::PartialFailure, message, stdout)
    };
    outcome.summary = summary;
    outcome
}

fn lenient_success(stdout: &str) -> SubmissionOutcome {
    let mut outcome = SubmissionOutcome::new(OutcomeKind::Success, stdout, stdout);
    outcome.summary = Summary {
        successful: 1,
        failed: 0,
    };
    outcome
}

fn is_authorisation_failure(text: &str) -> bool {
    text.contains(AUTHORISATION) && (text.contains(MUST_BE_AUTHENTICATED) || text.contains(FAILED))
}

/// Locate and parse the JSON report following [`RESPONSE_MARKER`]
///
/// The report spans from the first `{` after the marker to the last `}` in
/// stdout. Returns `None` when there is no marker or no braces.
fn extract_report(stdout: &str) -> Option<serde_json::Result<ServerReport>> {
    let (_, after) = stdout.split_once(RESPONSE_MARKER)?;
    let start = after.find('{')?;
    let end = after.rfind('}')?;
    if end < start {
        return None;
    }
    Some(serde_json::from_str(&after[start..=end]))
}

/// Path announced by a `Generated JSON file: <path>` line, if any
///
/// The marker is matched case-insensitively; the path runs to the last
/// `.json` on that line.
pub fn generated_json_file(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let lower = line.to_ascii_lowercase();
        let at = lower.find(GENERATED_FILE_MARKER)?;
        let rest = &line[at + GENERATED_FILE_MARKER.len()..];
        let rest = rest.strip_prefix(' ')?;
        let end = rest.to_ascii_lowercase().rfind(".json")? + ".json".len();
        let path = &rest[..end];
        (!path.trim().is_empty() && path != ".json").then(|| path.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(stdout: &str) -> DispatchResult {
        DispatchResult::exited(0, stdout, "")
    }

    #[test]
    fn test_report_with_success() {
        let out = classify(&ok(
            r#"Response from server: {"summary":{"successful":1,"failed":0},"objects":[{"successful":true}]}"#,
        ));
        assert_eq!(out.kind, OutcomeKind::Success);
        assert_eq!(out.summary, Summary { successful: 1, failed: 0 });
    }

    #[test]
    fn test_report_with_failure_uses_first_error_message() {
        let out = classify(&ok(
            r#"Response from server: {"summary":{"successful":0,"failed":1},"objects":[{"successful":false,"error_messages":["no such object: foo"]}]}"#,
        ));
        assert_eq!(out.kind, OutcomeKind::PartialFailure);
        assert_eq!(out.message, "no such object: foo");
        assert_eq!(out.summary.failed, 1);
    }

    #[test]
    fn test_report_skips_successful_objects_when_picking_message() {
        let stdout = r#"Submitting...
Response from server:
{
    "summary": {"successful": 1, "failed": 1},
    "objects": [
        {"successful": true, "error_messages": []},
        {"successful": false, "error_messages": ["Object route 10.0.0.0/8 overlaps", "second"]}
    ]
}
"#;
        let out = classify(&ok(stdout));
        assert_eq!(out.kind, OutcomeKind::PartialFailure);
        assert_eq!(out.message, "Object route 10.0.0.0/8 overlaps");
        assert_eq!(out.details, stdout);
    }

    #[test]
    fn test_report_failure_without_messages_uses_default() {
        let out = classify(&ok(r#"Response from server: {"summary":{"successful":0,"failed":0},"objects":[]}"#));
        assert_eq!(out.kind, OutcomeKind::PartialFailure);
        assert_eq!(out.message, DEFAULT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_report_authorisation_message_is_rerouted() {
        let out = classify(&ok(
            r#"Response from server: {"summary":{"successful":0,"failed":1},"objects":[{"successful":false,"error_messages":["Authorisation for route 192.0.2.0/24 failed: must be authenticated by one of: MAINT-X"]}]}"#,
        ));
        assert_eq!(out.kind, OutcomeKind::AuthorizationFailure);
        assert!(out.message.starts_with("Authorisation for route"));
    }

    #[test]
    fn test_unparseable_report_is_lenient_success() {
        let stdout = "Response from server: {not json}";
        let out = classify(&ok(stdout));
        assert_eq!(out.kind, OutcomeKind::Success);
        assert_eq!(out.message, stdout);
        assert_eq!(out.summary, Summary { successful: 1, failed: 0 });
    }

    #[test]
    fn test_missing_report_is_lenient_success() {
        let out = classify(&ok("all done"));
        assert_eq!(out.kind, OutcomeKind::Success);
        assert_eq!(out.message, "all done");
    }

    #[test]
    fn test_report_without_summary_counts_is_success() {
        let out = classify(&ok(r#"Response from server: {"error": "503 Server Error", "response": "No response"}"#));
        assert_eq!(out.kind, OutcomeKind::Success);
    }

    #[test]
    fn test_stderr_precedence() {
        let both = DispatchResult::exited(
            1,
            "",
            "authentication failed; also not authoritative",
        );
        assert_eq!(classify(&both).kind, OutcomeKind::NotAuthoritative);

        let auth = DispatchResult::exited(1, "", "Error: authentication failed for MAINT-X");
        assert_eq!(classify(&auth).kind, OutcomeKind::AuthenticationFailure);

        let authz = DispatchResult::exited(0, "", "Authorisation for mntner MAINT-X failed");
        assert_eq!(classify(&authz).kind, OutcomeKind::AuthorizationFailure);

        let authz = DispatchResult::exited(1, "", "Authorisation: object must be authenticated");
        assert_eq!(classify(&authz).kind, OutcomeKind::AuthorizationFailure);

        let missing = DispatchResult::exited(1, "", "no such object route 10.0.0.0/8");
        let out = classify(&missing);
        assert_eq!(out.kind, OutcomeKind::NotFound);
        assert_eq!(out.details, "no such object route 10.0.0.0/8");
    }

    #[test]
    fn test_authentication_failure_ignores_stdout_and_exit() {
        let success_report = r#"Response from server: {"summary":{"successful":1,"failed":0},"objects":[{"successful":true}]}"#;
        for code in [0, 1, 2] {
            let result = DispatchResult::exited(code, success_report, "authentication failed");
            assert_eq!(classify(&result).kind, OutcomeKind::AuthenticationFailure);
        }
    }

    #[test]
    fn test_nonzero_exit_without_known_pattern_is_transport_error() {
        let result = DispatchResult::exited(2, "", "Traceback (most recent call last): ...");
        let out = classify(&result);
        assert_eq!(out.kind, OutcomeKind::TransportError);
        assert_eq!(out.details, "Traceback (most recent call last): ...");

        let timed_out = DispatchResult {
            exit: ExitState::TimedOut,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(classify(&timed_out).kind, OutcomeKind::TransportError);
    }

    #[test]
    fn test_zero_exit_with_unrelated_stderr_uses_report() {
        let result = DispatchResult::exited(0, "done", "DeprecationWarning: something");
        assert_eq!(classify(&result).kind, OutcomeKind::Success);
    }

    #[test]
    fn test_launch_failure_is_not_authoritative() {
        let out = classify(&DispatchResult::launch_failed("No such file or directory"));
        assert_eq!(out.kind, OutcomeKind::NotAuthoritative);
        assert!(out.message.contains("No such file or directory"));
    }

    #[test]
    fn test_generated_json_file_is_attached_on_every_branch() {
        let stdout = "Generated JSON file: objects/route_192_0_2_0_24.json\nResponse from server: {\"summary\":{\"successful\":0,\"failed\":1},\"objects\":[]}";
        let out = classify(&ok(stdout));
        assert_eq!(out.kind, OutcomeKind::PartialFailure);
        assert_eq!(out.generated_json_file.as_deref(), Some("objects/route_192_0_2_0_24.json"));

        let failed = DispatchResult::exited(1, stdout, "authentication failed");
        assert_eq!(
            classify(&failed).generated_json_file.as_deref(),
            Some("objects/route_192_0_2_0_24.json")
        );
    }

    #[test]
    fn test_generated_json_file_parsing() {
        assert_eq!(
            generated_json_file("generated JSON FILE: /tmp/a b.json trailing").as_deref(),
            Some("/tmp/a b.json")
        );
        assert_eq!(generated_json_file("Generated JSON file: report.txt"), None);
        assert_eq!(generated_json_file("nothing here"), None);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let result = DispatchResult::exited(
            0,
            r#"Generated JSON file: objects/x.json
Response from server: {"summary":{"successful":0,"failed":1},"objects":[{"successful":false,"error_messages":["rejected"]}]}"#,
            "warning",
        );
        assert_eq!(classify(&result), classify(&result));
    }

    #[test]
    fn test_outcome_kind_names() {
        assert_eq!(
            serde_json::to_string(&OutcomeKind::AuthorizationFailure).unwrap(),
            "\"authorization_failure\""
        );
        assert_eq!(OutcomeKind::NotAuthoritative.to_string(), "not_authoritative");
    }
}

// # Change Requests
//
// The logical description of one RPSL change as received from a caller.
// A request is transient: it is turned into a payload, dispatched and then
// dropped. Only the derived object record outlives it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// RPSL object classes the gateway accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectType {
    Route,
    Route6,
    AutNum,
    AsSet,
    RouteSet,
    Mntner,
    Person,
    Role,
}

impl ObjectType {
    /// RPSL class name, as it appears as the first attribute of an object
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Route => "route",
            ObjectType::Route6 => "route6",
            ObjectType::AutNum => "aut-num",
            ObjectType::AsSet => "as-set",
            ObjectType::RouteSet => "route-set",
            ObjectType::Mntner => "mntner",
            ObjectType::Person => "person",
            ObjectType::Role => "role",
        }
    }

    /// Whether the `multiple_routes` flag applies to this class
    pub fn is_route(&self) -> bool {
        matches!(self, ObjectType::Route | ObjectType::Route6)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "route" => Ok(ObjectType::Route),
            "route6" => Ok(ObjectType::Route6),
            "aut-num" => Ok(ObjectType::AutNum),
            "as-set" => Ok(ObjectType::AsSet),
            "route-set" => Ok(ObjectType::RouteSet),
            "mntner" => Ok(ObjectType::Mntner),
            "person" => Ok(ObjectType::Person),
            "role" => Ok(ObjectType::Role),
            other => Err(Error::validation(format!("Unsupported object type: {}", other))),
        }
    }
}

/// Requested registry operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Modify,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Modify => "modify",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Action::Add),
            "modify" => Ok(Action::Modify),
            "delete" => Ok(Action::Delete),
            other => Err(Error::validation(format!("Unsupported action: {}", other))),
        }
    }
}

/// One logical RPSL change
///
/// # Security
///
/// The Debug implementation does NOT expose the passwords.
#[derive(Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    /// RPSL class of the object
    pub object_type: ObjectType,

    /// Operation to perform
    pub action: Action,

    /// Raw RPSL body, forwarded verbatim
    pub object_text: String,

    /// Natural key supplied by the caller, derived from `object_text` when absent
    pub identifier: Option<String>,

    /// Maintainer passwords; only the first one is forwarded
    pub passwords: Vec<String>,

    /// Ask the dispatcher to expand a route into its more-specifics
    pub multiple_routes: bool,

    /// Target server alias; `None` selects the configured primary
    pub target_server: Option<String>,
}

impl fmt::Debug for ChangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRequest")
            .field("object_type", &self.object_type)
            .field("action", &self.action)
            .field("object_text", &self.object_text)
            .field("identifier", &self.identifier)
            .field("passwords", &format_args!("<{} REDACTED>", self.passwords.len()))
            .field("multiple_routes", &self.multiple_routes)
            .field("target_server", &self.target_server)
            .finish()
    }
}

impl ChangeRequest {
    /// Create a request with no passwords, no identifier and the primary server
    pub fn new(object_type: ObjectType, action: Action, object_text: impl Into<String>) -> Self {
        Self {
            object_type,
            action,
            object_text: object_text.into(),
            identifier: None,
            passwords: Vec::new(),
            multiple_routes: false,
            target_server: None,
        }
    }

    /// Add a maintainer password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.passwords.push(password.into());
        self
    }

    /// Set the natural key explicitly
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Set the multiple-routes flag
    pub fn with_multiple_routes(mut self, multiple_routes: bool) -> Self {
        self.multiple_routes = multiple_routes;
        self
    }

    /// Target a specific server alias
    pub fn with_server(mut self, alias: impl Into<String>) -> Self {
        self.target_server = Some(alias.into());
        self
    }

    /// Password forwarded to the dispatcher, if any
    pub fn first_password(&self) -> Option<&str> {
        self.passwords
            .first()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Natural key of the object
    ///
    /// Uses the caller-supplied identifier when present and non-blank,
    /// otherwise the value of the first RPSL attribute line.
    pub fn resolve_identifier(&self) -> Result<String> {
        if let Some(id) = self.identifier.as_deref().map(str::trim)
            && !id.is_empty()
        {
            return Ok(id.to_string());
        }

        identifier_from_rpsl(&self.object_text).ok_or_else(|| {
            Error::validation(
                "Cannot determine object identifier: first RPSL line must be 'attribute: value'",
            )
        })
    }
}

/// Extract the natural key from RPSL text
///
/// Skips blank lines and `#` comments, then returns the trimmed value of
/// the first `attribute: value` line.
pub fn identifier_from_rpsl(object_text: &str) -> Option<String> {
    let first = object_text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))?;

    let (_, value) = first.split_once(':')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_round_trips_through_serde() {
        let json = serde_json::to_string(&ObjectType::AutNum).unwrap();
        assert_eq!(json, "\"aut-num\"");
        let parsed: ObjectType = serde_json::from_str("\"route-set\"").unwrap();
        assert_eq!(parsed, ObjectType::RouteSet);
    }

    #[test]
    fn test_object_type_from_str() {
        assert_eq!("Route6".parse::<ObjectType>().unwrap(), ObjectType::Route6);
        assert!("inetnum".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_identifier_from_first_attribute() {
        let text = "\n# comment\nroute:      192.0.2.0/24\norigin:     AS65000\n";
        assert_eq!(identifier_from_rpsl(text).as_deref(), Some("192.0.2.0/24"));
    }

    #[test]
    fn test_identifier_missing() {
        assert_eq!(identifier_from_rpsl("no colon here"), None);
        assert_eq!(identifier_from_rpsl("route:   \n"), None);
        assert_eq!(identifier_from_rpsl(""), None);
    }

    #[test]
    fn test_explicit_identifier_wins() {
        let req = ChangeRequest::new(ObjectType::AutNum, Action::Add, "aut-num: AS65000\n")
            .with_identifier("AS65001");
        assert_eq!(req.resolve_identifier().unwrap(), "AS65001");

        let req = ChangeRequest::new(ObjectType::AutNum, Action::Add, "aut-num: AS65000\n")
            .with_identifier("   ");
        assert_eq!(req.resolve_identifier().unwrap(), "AS65000");
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let req = ChangeRequest::new(ObjectType::Mntner, Action::Modify, "mntner: MAINT-X")
            .with_password("hunter2");
        let rendered = format!("{:?}", req);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}

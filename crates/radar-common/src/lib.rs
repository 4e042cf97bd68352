// Shared identity and channel naming types used across crates.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid channel name: {0}")]
    InvalidChannel(String),
}

pub mod ids {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// User identifier as the server knows it.
    ///
    /// Accounts either use numeric ids or opaque strings, so both are accepted
    /// on the wire and kept in their original JSON shape.
    #[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum UserId {
        Number(u64),
        Text(String),
    }

    impl UserId {
        // Env vars and YAML scalars arrive as text; prefer the numeric form.
        pub fn parse(input: &str) -> Self {
            match input.parse::<u64>() {
                Ok(value) => Self::Number(value),
                Err(_) => Self::Text(input.to_string()),
            }
        }

        pub fn to_json(&self) -> serde_json::Value {
            match self {
                Self::Number(value) => serde_json::Value::from(*value),
                Self::Text(value) => serde_json::Value::from(value.as_str()),
            }
        }
    }

    impl Default for UserId {
        fn default() -> Self {
            Self::Number(0)
        }
    }

    impl From<u64> for UserId {
        fn from(value: u64) -> Self {
            Self::Number(value)
        }
    }

    impl From<&str> for UserId {
        fn from(value: &str) -> Self {
            Self::Text(value.to_string())
        }
    }

    impl fmt::Display for UserId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Number(value) => write!(f, "{value}"),
                Self::Text(value) => f.write_str(value),
            }
        }
    }
}

/// Local identity used to scope channel names and stamp `set` writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub account_name: String,
    pub user_id: ids::UserId,
    pub user_type: u32,
}

impl Identity {
    pub fn new(account_name: impl Into<String>, user_id: impl Into<ids::UserId>) -> Self {
        Self {
            account_name: account_name.into(),
            user_id: user_id.into(),
            user_type: 0,
        }
    }

    pub fn with_user_type(mut self, user_type: u32) -> Self {
        self.user_type = user_type;
        self
    }

    // Qualify a scope under this identity's account.
    pub fn channel(&self, kind: ChannelKind, scope: &str) -> ChannelName {
        ChannelName::new(kind, &self.account_name, scope)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ChannelKind {
    Message,
    Presence,
    Status,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Presence => "presence",
            Self::Status => "status",
        }
    }
}

impl FromStr for ChannelKind {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input {
            "message" => Ok(Self::Message),
            "presence" => Ok(Self::Presence),
            "status" => Ok(Self::Status),
            other => Err(Error::InvalidChannel(other.to_string())),
        }
    }
}

/// Fully qualified channel name, `<kind>:/<account>/<scope>`.
///
/// ```
/// use radar_common::{ChannelKind, ChannelName};
///
/// let name = ChannelName::new(ChannelKind::Presence, "acct", "room");
/// assert_eq!(name.as_str(), "presence:/acct/room");
/// let parsed: ChannelName = "presence:/acct/room".parse().expect("parse");
/// assert_eq!(parsed.kind(), ChannelKind::Presence);
/// assert_eq!(parsed.scope(), "room");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChannelName {
    kind: ChannelKind,
    // Full string is kept so the name can be used as an event key without reformatting.
    full: String,
    scope_offset: usize,
}

impl ChannelName {
    pub fn new(kind: ChannelKind, account_name: &str, scope: &str) -> Self {
        let full = format!("{}:/{}/{}", kind.as_str(), account_name, scope);
        let scope_offset = full.len() - scope.len();
        Self {
            kind,
            full,
            scope_offset,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn account_name(&self) -> &str {
        let start = self.kind.as_str().len() + 2;
        &self.full[start..self.scope_offset - 1]
    }

    pub fn scope(&self) -> &str {
        &self.full[self.scope_offset..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for ChannelName {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidChannel(input.to_string());
        let (kind, rest) = input.split_once(":/").ok_or_else(invalid)?;
        let kind = kind.parse::<ChannelKind>().map_err(|_| invalid())?;
        let (account, scope) = rest.split_once('/').ok_or_else(invalid)?;
        if account.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(kind, account, scope))
    }
}

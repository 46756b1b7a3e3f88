use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DID_PREFIX: &str = "did:";

const USER_ID_SEPARATOR: char = '-';
const MESSAGE_ID_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DidError {
    #[error("DID must start with \"did:\": {0}")]
    MissingPrefix(String),
    #[error("DID has no method-specific identifier: {0}")]
    MissingIdentifier(String),
    #[error("invalid DID method {method:?} in {did}")]
    InvalidMethod { did: String, method: String },
    #[error("invalid character {ch:?} in DID {did}")]
    InvalidCharacter { did: String, ch: char },
}

/// A parsed decentralized identifier, `did:<method>:<identifier>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    method: String,
    identifier: String,
}

impl Did {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(DID_PREFIX)
            .ok_or_else(|| DidError::MissingPrefix(s.to_string()))?;
        let (method, identifier) = rest
            .split_once(':')
            .ok_or_else(|| DidError::MissingIdentifier(s.to_string()))?;

        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(DidError::InvalidMethod {
                did: s.to_string(),
                method: method.to_string(),
            });
        }
        if identifier.is_empty() || identifier.ends_with(':') {
            return Err(DidError::MissingIdentifier(s.to_string()));
        }
        if let Some(ch) = identifier
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '%' | '-')))
        {
            return Err(DidError::InvalidCharacter {
                did: s.to_string(),
                ch,
            });
        }

        Ok(Did {
            method: method.to_string(),
            identifier: identifier.to_string(),
        })
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DID_PREFIX}{}:{}", self.method, self.identifier)
    }
}

impl TryFrom<String> for Did {
    type Error = DidError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Did::from_str(&value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.to_string()
    }
}

macro_rules! define_string_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }

                pub fn is_empty(&self) -> bool {
                    self.0.is_empty()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

define_string_id! {
    /// Internal id of a remote user (a ghost), `<method>-<identifier>`.
    UserId,
    /// Internal id of a bridged conversation; the remote convo id verbatim.
    PortalId,
    /// Internal id of a message, `<portal id>:<remote message id>`.
    MessageId,
    /// Id of a logged-in account; its DID verbatim.
    UserLoginId,
}

/// Addresses a portal as seen by one login. Bluesky chats are all DMs, so
/// the receiver is always set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortalKey {
    pub id: PortalId,
    pub receiver: UserLoginId,
}

pub fn make_user_login_id(did: &str) -> UserLoginId {
    UserLoginId::new(did)
}

pub fn parse_user_login_id(id: &UserLoginId) -> &str {
    id.as_str()
}

pub fn make_user_id(did: &Did) -> UserId {
    UserId(format!(
        "{}{USER_ID_SEPARATOR}{}",
        did.method(),
        did.identifier()
    ))
}

pub fn make_user_id_from_str(raw_did: &str) -> Result<UserId, DidError> {
    raw_did.parse::<Did>().map(|did| make_user_id(&did))
}

/// Reverses [`make_user_id`]. The method is everything up to the first `-`,
/// so a method containing `-` would not survive the round trip.
///
/// Returns `None` when the id has no separator.
pub fn parse_user_id(id: &UserId) -> Option<Did> {
    let (method, identifier) = id.as_str().split_once(USER_ID_SEPARATOR)?;
    Some(Did {
        method: method.to_string(),
        identifier: identifier.to_string(),
    })
}

pub fn make_portal_id(convo_id: &str) -> PortalId {
    PortalId::new(convo_id)
}

pub fn parse_portal_id(id: &PortalId) -> &str {
    id.as_str()
}

pub fn make_message_id(portal_id: &PortalId, msg_id: &str) -> MessageId {
    MessageId(format!("{portal_id}{MESSAGE_ID_SEPARATOR}{msg_id}"))
}

/// Splits a message id on its first `:`. Returns `None` when there is no
/// separator; callers must reject the operation in that case.
pub fn parse_message_id(id: &MessageId) -> Option<(PortalId, String)> {
    let (portal, msg_id) = id.as_str().split_once(MESSAGE_ID_SEPARATOR)?;
    Some((PortalId::new(portal), msg_id.to_string()))
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DISPLAYNAME_TEMPLATE: &str = "{displayname}";

const PLACEHOLDERS: [&str; 3] = ["displayname", "handle", "did"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown placeholder {{{0}}} in displayname_template")]
    UnknownPlaceholder(String),
    #[error("unterminated placeholder in displayname_template")]
    Unterminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template for ghost display names. Supports `{displayname}`,
    /// `{handle}` and `{did}`.
    pub displayname_template: String,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            displayname_template: DEFAULT_DISPLAYNAME_TEMPLATE.to_string(),
            user_agent: format!("bluesky-bridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn segments(template: &str) -> Result<Vec<Segment<'_>>, ConfigError> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        if start > 0 {
            out.push(Segment::Literal(&rest[..start]));
        }
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or(ConfigError::Unterminated)?;
        let name = &after[..end];
        if !PLACEHOLDERS.contains(&name) {
            return Err(ConfigError::UnknownPlaceholder(name.to_string()));
        }
        out.push(Segment::Placeholder(name));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        out.push(Segment::Literal(rest));
    }
    Ok(out)
}

impl Config {
    /// Validates the config after deserialization.
    pub fn post_process(&self) -> Result<(), ConfigError> {
        segments(&self.displayname_template).map(|_| ())
    }

    /// Renders the display name template. A blank result falls back to the
    /// handle so ghosts are never nameless.
    pub fn format_displayname(&self, displayname: &str, handle: &str, did: &str) -> String {
        let rendered = match segments(&self.displayname_template) {
            Ok(parts) => parts
                .into_iter()
                .map(|part| match part {
                    Segment::Literal(text) => text,
                    Segment::Placeholder("displayname") => displayname,
                    Segment::Placeholder("handle") => handle,
                    Segment::Placeholder(_) => did,
                })
                .collect::<String>(),
            Err(_) => displayname.to_string(),
        };
        if rendered.trim().is_empty() {
            handle.to_string()
        } else {
            rendered
        }
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{Result, TransferError};

/// Opaque name of a byte-addressable resource, e.g. `content://...`,
/// `file:///...` or a plain path.
///
/// Identifiers are never empty and never change once obtained.
#[derive(Eq, PartialEq, Hash, Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(TransferError::invalid_id(value, "identifier is empty"));
        }
        Ok(ResourceId(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier as a URL, if it carries a scheme.
    ///
    /// Single-letter schemes are drive letters (`C:\...`), not URLs.
    pub fn as_url(&self) -> Option<Url> {
        Url::parse(&self.0)
            .ok()
            .filter(|url| url.scheme().len() > 1)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceId::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self> {
        ResourceId::parse(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

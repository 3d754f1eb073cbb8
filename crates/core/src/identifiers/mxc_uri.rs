//! A URI that should be a Matrix-spec compliant [MXC URI].
//!
//! [MXC URI]: https://spec.matrix.org/latest/client-server-api/#matrix-content-mxc-uris

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use super::{validation, ServerName};
use crate::error::IdParseError;

/// A Matrix content URI, `mxc://<server_name>/<media_id>`.
///
/// Parsing accepts exactly one `/` after the authority; anything else is
/// rejected. The formatted form round-trips the input exactly.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MxcUri {
    server_name: ServerName,
    media_id: Box<str>,
}

impl MxcUri {
    /// The server name part of the URI.
    pub fn server_name(&self) -> &ServerName {
        &self.server_name
    }

    /// The media ID part of the URI.
    pub fn media_id(&self) -> &str {
        &self.media_id
    }
}

impl FromStr for MxcUri {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("mxc://").ok_or(IdParseError::MalformedMxcUri)?;
        let (server, media_id) = rest.split_once('/').ok_or(IdParseError::MalformedMxcUri)?;
        if media_id.is_empty() || media_id.contains('/') {
            return Err(IdParseError::MalformedMxcUri);
        }
        validation::server_name(server).map_err(|_| IdParseError::MalformedMxcUri)?;
        Ok(Self {
            server_name: ServerName::parse(server).map_err(|_| IdParseError::MalformedMxcUri)?,
            media_id: media_id.into(),
        })
    }
}

impl fmt::Display for MxcUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mxc://{}/{}", self.server_name, self.media_id)
    }
}

impl Serialize for MxcUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MxcUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::MxcUri;
    use crate::error::IdParseError;

    #[test]
    fn parse_mxc_uri() {
        let mxc: MxcUri = "mxc://example.org/abc123".parse().unwrap();
        assert_eq!(mxc.server_name().as_str(), "example.org");
        assert_eq!(mxc.media_id(), "abc123");
        assert_eq!(mxc.to_string(), "mxc://example.org/abc123");
    }

    #[test]
    fn parse_mxc_uri_without_media_id() {
        assert_eq!("mxc://example.org".parse::<MxcUri>(), Err(IdParseError::MalformedMxcUri));
        assert_eq!("mxc://example.org/".parse::<MxcUri>(), Err(IdParseError::MalformedMxcUri));
    }

    #[test]
    fn parse_mxc_uri_with_extra_slash() {
        assert_eq!("mxc://example.org/a/b".parse::<MxcUri>(), Err(IdParseError::MalformedMxcUri));
    }

    #[test]
    fn parse_mxc_uri_without_protocol() {
        assert_eq!("example.org/abc".parse::<MxcUri>(), Err(IdParseError::MalformedMxcUri));
    }

    #[test]
    fn serialize_mxc_uri() {
        let mxc: MxcUri = "mxc://server/1234id".parse().unwrap();
        assert_eq!(serde_json::to_string(&mxc).unwrap(), r#""mxc://server/1234id""#);
    }
}

/// Displayable rendering form.
///
/// Renderings travel through the store and the UI as `data:` URIs, the same
/// text form a browser image element accepts. Only the job channel turns
/// them back into raw bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fmt;
use std::str::FromStr;

use crate::error::TranscodeError;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// MIME type used for every rendering produced by the computation unit.
pub const PNG_MIME: &str = "image/png";

/// A base64 `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataUri(String);

impl DataUri {
    /// Encode raw bytes with the given MIME type.
    pub fn encode(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("{SCHEME}{mime}{BASE64_MARKER}{}", BASE64.encode(bytes)))
    }

    /// Encode a PNG rendering.
    pub fn png(bytes: &[u8]) -> Self {
        Self::encode(PNG_MIME, bytes)
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>, TranscodeError> {
        let (_, payload) = split(&self.0)?;
        Ok(BASE64.decode(payload)?)
    }

    /// MIME type declared in the header, e.g. `image/jpeg`.
    pub fn mime(&self) -> &str {
        split(&self.0).map(|(mime, _)| mime).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn split(uri: &str) -> Result<(&str, &str), TranscodeError> {
    let rest = uri.strip_prefix(SCHEME).ok_or(TranscodeError::MissingScheme)?;
    let marker = rest.find(BASE64_MARKER).ok_or(TranscodeError::NotBase64)?;
    Ok((&rest[..marker], &rest[marker + BASE64_MARKER.len()..]))
}

impl FromStr for DataUri {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        split(s)?;
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

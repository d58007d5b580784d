//! Media type classification by filename extension.

use serde::{Deserialize, Serialize};

/// Semantic media type recorded for cataloged files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,

    #[serde(rename = "image/svg+xml")]
    Svg,

    #[serde(rename = "image/gif")]
    Gif,

    #[serde(rename = "text/html")]
    Html,

    #[serde(rename = "application/html+xml")]
    Xhtml,

    #[serde(rename = "application/epub+zip")]
    Epub,

    /// Anything not recognized
    #[serde(rename = "unknown/unknown")]
    Unknown,
}

impl MediaType {
    /// The MIME string stored in the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Svg => "image/svg+xml",
            MediaType::Gif => "image/gif",
            MediaType::Html => "text/html",
            MediaType::Xhtml => "application/html+xml",
            MediaType::Epub => "application/epub+zip",
            MediaType::Unknown => "unknown/unknown",
        }
    }

    /// Inverse of [`MediaType::as_str`]; unrecognized strings map to `Unknown`
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "image/jpeg" => MediaType::Jpeg,
            "image/svg+xml" => MediaType::Svg,
            "image/gif" => MediaType::Gif,
            "text/html" => MediaType::Html,
            "application/html+xml" => MediaType::Xhtml,
            "application/epub+zip" => MediaType::Epub,
            _ => MediaType::Unknown,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a filename by the text after its last `.`.
///
/// Matching is case-sensitive; only lowercase extensions are recognized.
pub fn classify(filename: &str) -> MediaType {
    let extension = filename.rsplit('.').next().unwrap_or(filename);

    match extension {
        "jpg" | "jpeg" => MediaType::Jpeg,
        "svg" => MediaType::Svg,
        "gif" => MediaType::Gif,
        "html" | "htm" => MediaType::Html,
        "xhtml" => MediaType::Xhtml,
        "epub" => MediaType::Epub,
        _ => MediaType::Unknown,
    }
}

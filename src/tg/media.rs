use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Byte fields (`file_reference`, stripped thumbnails, part hashes) are
/// written as base64 strings in JSON.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_")]
pub enum DocumentAttribute {
    #[serde(rename = "DocumentAttributeVideo")]
    Video { w: i32, h: i32, duration: f64 },
    #[serde(rename = "DocumentAttributeImageSize")]
    ImageSize { w: i32, h: i32 },
    #[serde(rename = "DocumentAttributeFilename")]
    Filename { file_name: String },
    #[serde(rename = "DocumentAttributeAudio")]
    Audio { duration: i32 },
    #[serde(rename = "DocumentAttributeAnimated")]
    Animated,
    #[serde(rename = "DocumentAttributeSticker")]
    Sticker,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_")]
pub enum PhotoSize {
    #[serde(rename = "PhotoSize")]
    Size {
        #[serde(rename = "type")]
        kind: String,
        w: i32,
        h: i32,
        size: i32,
    },
    /// A progressive JPEG; `sizes` lists the byte length of each scan.
    #[serde(rename = "PhotoSizeProgressive")]
    Progressive {
        #[serde(rename = "type")]
        kind: String,
        w: i32,
        h: i32,
        sizes: Vec<i32>,
    },
    #[serde(rename = "PhotoStrippedSize")]
    Stripped {
        #[serde(rename = "type")]
        kind: String,
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
}

impl PhotoSize {
    pub fn kind(&self) -> &str {
        match self {
            PhotoSize::Size { kind, .. }
            | PhotoSize::Progressive { kind, .. }
            | PhotoSize::Stripped { kind, .. } => kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub access_hash: i64,
    #[serde(with = "base64_bytes")]
    pub file_reference: Vec<u8>,
    pub dc_id: i32,
    pub size: i64,
    pub mime_type: String,
    #[serde(default)]
    pub attributes: Vec<DocumentAttribute>,
    #[serde(default)]
    pub thumbs: Vec<PhotoSize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub access_hash: i64,
    #[serde(with = "base64_bytes")]
    pub file_reference: Vec<u8>,
    pub dc_id: i32,
    #[serde(default)]
    pub sizes: Vec<PhotoSize>,
}

/// Media attached to a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_")]
pub enum Media {
    #[serde(rename = "MessageMediaDocument")]
    Document { document: Document },
    #[serde(rename = "MessageMediaPhoto")]
    Photo { photo: Photo },
    /// Web previews, polls, locations and other media carrying no file.
    #[serde(rename = "MessageMediaUnsupported")]
    Unsupported,
}

impl Media {
    /// Whether the media has a downloadable file behind it.
    pub fn has_file(&self) -> bool {
        !matches!(self, Media::Unsupported)
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Media::Document { document } => Some(document.id),
            Media::Photo { photo } => Some(photo.id),
            Media::Unsupported => None,
        }
    }

    pub fn access_hash(&self) -> Option<i64> {
        match self {
            Media::Document { document } => Some(document.access_hash),
            Media::Photo { photo } => Some(photo.access_hash),
            Media::Unsupported => None,
        }
    }

    pub fn dc_id(&self) -> Option<i32> {
        match self {
            Media::Document { document } => Some(document.dc_id),
            Media::Photo { photo } => Some(photo.dc_id),
            Media::Unsupported => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            Media::Document { document } => {
                document.attributes.iter().find_map(|attr| match attr {
                    DocumentAttribute::Filename { file_name } => Some(file_name.as_str()),
                    _ => None,
                })
            }
            _ => None,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Media::Document { document } => Some(document.mime_type.as_str()),
            Media::Photo { .. } => Some("image/jpeg"),
            Media::Unsupported => None,
        }
    }

    /// File extension including the leading dot, or an empty string.
    ///
    /// Taken from the document's file name when it has one, otherwise guessed
    /// from the mime type.
    pub fn extension(&self) -> String {
        if let Some(ext) = self
            .file_name()
            .and_then(|name| std::path::Path::new(name).extension())
            .and_then(|ext| ext.to_str())
        {
            return format!(".{}", ext);
        }
        self.mime_type()
            .and_then(extension_for_mime)
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }

    /// Where the file lives, as `(dc_id, location)`.
    ///
    /// `thumb` asks for the largest thumbnail instead of the full file.
    pub fn input_location(&self, thumb: bool) -> Result<(i32, InputFileLocation)> {
        match self {
            Media::Document { document } => {
                let thumb_size = if thumb {
                    document
                        .thumbs
                        .last()
                        .map(|size| size.kind().to_string())
                        .unwrap_or_default()
                } else {
                    String::new()
                };
                Ok((
                    document.dc_id,
                    InputFileLocation::Document {
                        id: document.id,
                        access_hash: document.access_hash,
                        file_reference: document.file_reference.clone(),
                        thumb_size,
                    },
                ))
            }
            Media::Photo { photo } => {
                let thumb_size = photo
                    .sizes
                    .last()
                    .map(|size| size.kind().to_string())
                    .unwrap_or_default();
                Ok((
                    photo.dc_id,
                    InputFileLocation::Photo {
                        id: photo.id,
                        access_hash: photo.access_hash,
                        file_reference: photo.file_reference.clone(),
                        thumb_size,
                    },
                ))
            }
            Media::Unsupported => Err(Error::UnsupportedMedia(
                "media has no file location".to_string(),
            )),
        }
    }
}

// Used instead of the first extension mime_guess lists for these types
fn preferred_extension(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpg"),
        "audio/mpeg" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "video/quicktime" => Some("mov"),
        "application/x-tgsticker" => Some("tgs"),
        _ => None,
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    preferred_extension(mime)
        .or_else(|| mime_guess::get_mime_extensions_str(mime)?.first().copied())
}

/// A request-ready pointer to a stored file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputFileLocation {
    Document {
        id: i64,
        access_hash: i64,
        file_reference: Vec<u8>,
        thumb_size: String,
    },
    Photo {
        id: i64,
        access_hash: i64,
        file_reference: Vec<u8>,
        thumb_size: String,
    },
}

impl InputFileLocation {
    pub fn id(&self) -> i64 {
        match self {
            InputFileLocation::Document { id, .. } | InputFileLocation::Photo { id, .. } => *id,
        }
    }
}

/// Hash of one stored part of a file, as returned by `upload.getFileHashes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    pub offset: i64,
    pub limit: i32,
    #[serde(with = "base64_bytes")]
    pub hash: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(mime: &str, attributes: Vec<DocumentAttribute>) -> Media {
        Media::Document {
            document: Document {
                id: 10,
                access_hash: 20,
                file_reference: vec![1, 2, 3],
                dc_id: 4,
                size: 1000,
                mime_type: mime.to_string(),
                attributes,
                thumbs: vec![],
            },
        }
    }

    #[test]
    fn extension_prefers_file_name() {
        let media = document(
            "video/mp4",
            vec![DocumentAttribute::Filename {
                file_name: "clip.mkv".to_string(),
            }],
        );
        assert_eq!(media.extension(), ".mkv");
        assert_eq!(media.file_name(), Some("clip.mkv"));
    }

    #[test]
    fn extension_falls_back_to_mime() {
        assert_eq!(document("video/mp4", vec![]).extension(), ".mp4");
        assert_eq!(document("application/x-unknown", vec![]).extension(), "");
    }

    #[test]
    fn extension_covers_less_common_types() {
        assert_eq!(document("audio/flac", vec![]).extension(), ".flac");
        assert_eq!(document("application/pdf", vec![]).extension(), ".pdf");
        assert_eq!(document("image/jpeg", vec![]).extension(), ".jpg");
        assert_eq!(document("audio/mpeg", vec![]).extension(), ".mp3");
        assert_eq!(document("application/x-tgsticker", vec![]).extension(), ".tgs");
        assert!(!document("video/3gpp", vec![]).extension().is_empty());
    }

    #[test]
    fn unsupported_media_has_no_location() {
        assert!(matches!(
            Media::Unsupported.input_location(false),
            Err(Error::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn document_location_carries_dc_and_reference() {
        let (dc, location) = document("video/mp4", vec![]).input_location(false).unwrap();
        assert_eq!(dc, 4);
        assert_eq!(
            location,
            InputFileLocation::Document {
                id: 10,
                access_hash: 20,
                file_reference: vec![1, 2, 3],
                thumb_size: String::new(),
            }
        );
    }

    #[test]
    fn file_reference_is_base64_in_json() {
        let value = serde_json::to_value(document("video/mp4", vec![])).unwrap();
        assert_eq!(value["_"], "MessageMediaDocument");
        assert_eq!(value["document"]["file_reference"], "AQID");
    }
}

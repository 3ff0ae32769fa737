use std::fs;
use std::io;
use std::path::Path;

use base64::engine::general_purpose;
use base64::Engine as _;

/// Captured image handed to a verification service.
#[derive(Clone, PartialEq, Eq)]
pub struct EvidenceImage {
    pub file_name: Option<String>,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for EvidenceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceImage")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl EvidenceImage {
    pub fn from_bytes(file_name: Option<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read an image file, guessing its media type from the extension.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let media_type = mime_guess::from_path(path)
            .first()
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .map(|mime| mime.essence_str().to_string())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is not an image", path.display()),
                )
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self::from_bytes(file_name, media_type, bytes))
    }

    /// `data:<type>;base64,<payload>` form expected by the backend.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Short reference stored with the capture result instead of the bytes.
    pub fn reference(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("inline-{}-bytes", self.bytes.len()))
    }
}

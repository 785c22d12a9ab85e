use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use engine_logging::{engine_debug, engine_warn};
use tempfile::TempPath;

use crate::filename::artifact_filename;
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::types::ToolError;

/// Stages downloaded media as local files.
///
/// A staged file lives exactly as long as its [`LocalArtifact`] handle.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn materialize(&self, bytes: &[u8], mime_type: &str) -> Result<LocalArtifact, PersistError> {
        ensure_output_dir(&self.dir)?;
        let suffix = format!(".{}", extension_for_mime(mime_type));
        let mut file = tempfile::Builder::new()
            .prefix("artifact-")
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        let path = file.into_temp_path();
        engine_debug!(
            "Materialized {} bytes of {} at {:?}",
            bytes.len(),
            mime_type,
            path
        );
        Ok(LocalArtifact {
            path,
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
        })
    }
}

/// Locally addressable generated media. Dropping the handle deletes the file.
pub struct LocalArtifact {
    path: TempPath,
    mime_type: String,
    size: u64,
}

impl fmt::Debug for LocalArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalArtifact")
            .field("path", &self.path())
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .finish()
    }
}

impl LocalArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Moves the file to `dest`, after which it is no longer released on drop.
    pub fn keep(self, dest: &Path) -> Result<PathBuf, PersistError> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_output_dir(parent)?;
        }
        self.path
            .persist(dest)
            .map_err(|err| PersistError::Io(err.error))?;
        Ok(dest.to_path_buf())
    }

    /// Deletes the file now and reports failures instead of swallowing them on drop.
    pub fn release(self) -> Result<(), PersistError> {
        self.path.close().map_err(PersistError::Io)
    }
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Splits a base64 `data:` URI into its mime type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), ToolError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ToolError::malformed("not a data uri"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ToolError::malformed("data uri without payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ToolError::malformed("data uri is not base64 encoded"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| ToolError::malformed(format!("invalid base64 payload: {err}")))?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    Ok((mime.to_string(), bytes))
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "text/plain" => "txt",
        "application/json" => "json",
        _ => "bin",
    }
}

/// Saves a `data:` URI artifact into `dir` under a deterministic name derived from `hint`.
pub fn save_artifact(dir: &Path, hint: Option<&str>, uri: &str) -> Result<PathBuf, ToolError> {
    let (mime, bytes) = decode_data_uri(uri)?;
    let filename = artifact_filename(hint, &bytes, extension_for_mime(&mime));
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    writer.write_bytes(&filename, &bytes).map_err(|err| {
        engine_warn!("Failed to save artifact into {:?}: {}", dir, err);
        ToolError::from(err)
    })
}

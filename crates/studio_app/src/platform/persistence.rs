use std::fs;
use std::path::Path;

use chrono::Utc;
use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use studio_core::Profile;
use studio_engine::AtomicFileWriter;

const SESSION_FILENAME: &str = ".studio_session.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedProfile {
    id: String,
    name: String,
    email: String,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
struct PersistedSession {
    #[serde(default)]
    profile: Option<PersistedProfile>,
    #[serde(default)]
    referral: Option<String>,
    #[serde(default)]
    saved_utc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct StoredSession {
    pub(crate) profile: Option<Profile>,
    pub(crate) referral: Option<String>,
}

/// Reads the session file; a missing or unreadable file is an empty session.
pub(crate) fn load_session(dir: &Path) -> StoredSession {
    let path = dir.join(SESSION_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return StoredSession::default();
        }
        Err(err) => {
            engine_warn!("Failed to read session from {:?}: {}", path, err);
            return StoredSession::default();
        }
    };

    let session: PersistedSession = match ron::from_str(&content) {
        Ok(session) => session,
        Err(err) => {
            engine_warn!("Discarding corrupt session file {:?}: {}", path, err);
            return StoredSession::default();
        }
    };

    engine_info!("Loaded session from {:?}", path);
    StoredSession {
        profile: session.profile.map(|p| Profile {
            id: p.id,
            name: p.name,
            email: p.email,
            avatar: p.avatar,
        }),
        referral: session.referral,
    }
}

pub(crate) fn save_session(dir: &Path, profile: Option<&Profile>, referral: Option<&str>) {
    let session = PersistedSession {
        profile: profile.map(|p| PersistedProfile {
            id: p.id.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
            avatar: p.avatar.clone(),
        }),
        referral: referral.map(str::to_owned),
        saved_utc: Some(Utc::now().to_rfc3339()),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&session, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize session: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(dir.to_path_buf());
    if let Err(err) = writer.write(SESSION_FILENAME, &content) {
        engine_error!("Failed to write session to {:?}: {}", dir, err);
    }
}

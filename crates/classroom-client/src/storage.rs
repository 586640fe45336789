//! Persisted session storage and `SessionContext` loading.
//!
//! The dashboard stores a JSON session blob plus a fallback raw token before
//! handing over to the classroom view. Both are read once at bootstrap and
//! injected as a plain value so nothing downstream touches storage.

use common::secret::{is_blank, SecretString};
use common::types::SessionId;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::errors::BootstrapError;

/// File name of the stored session blob inside the storage directory.
pub const SESSION_BLOB_FILE: &str = "session.json";

/// File name of the fallback raw token inside the storage directory.
pub const FALLBACK_TOKEN_FILE: &str = "token";

/// Host name shown when the stored blob carries none.
pub const DEFAULT_HOST_DISPLAY_NAME: &str = "Mentor";

/// Course title shown when the stored blob carries none.
pub const DEFAULT_COURSE_TITLE: &str = "Live Session";

/// Local name used when the stored blob carries none.
pub const DEFAULT_PARTICIPANT_NAME: &str = "Student";

/// Immutable parameters of one classroom session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: SessionId,
    /// Single-use room token. Redacted in `Debug`.
    pub access_token: SecretString,
    pub host_display_name: String,
    pub course_title: String,
    pub local_participant_name: String,
}

/// Raw values read from persisted storage.
#[derive(Debug, Clone, Default)]
pub struct PersistedStorage {
    /// Stored session blob (JSON), if any.
    pub session_blob: Option<String>,
    /// Fallback raw token, if any.
    pub fallback_token: Option<SecretString>,
}

/// Shape of the stored session blob.
///
/// Field aliases cover the names the dashboard has used for the same values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSessionBlob {
    #[serde(alias = "roomId", alias = "id")]
    session_id: Option<String>,
    #[serde(alias = "authToken", alias = "token")]
    access_token: Option<SecretString>,
    #[serde(alias = "hostDisplayName", alias = "mentorName")]
    host_name: Option<String>,
    #[serde(alias = "courseName")]
    course_title: Option<String>,
    #[serde(alias = "userName", alias = "localParticipantName")]
    participant_name: Option<String>,
}

impl PersistedStorage {
    /// Create storage from in-memory values.
    #[must_use]
    pub fn new(session_blob: Option<String>, fallback_token: Option<SecretString>) -> Self {
        Self {
            session_blob,
            fallback_token,
        }
    }

    /// Read `session.json` and `token` from `dir`. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Storage`] if a file exists but cannot be read.
    pub fn from_dir(dir: &Path) -> Result<Self, BootstrapError> {
        let session_blob = read_optional(&dir.join(SESSION_BLOB_FILE))?;
        let fallback_token = read_optional(&dir.join(FALLBACK_TOKEN_FILE))?
            .map(|raw| SecretString::from(raw.trim().to_string()));

        debug!(
            target: "classroom.bootstrap",
            dir = %dir.display(),
            has_session_blob = session_blob.is_some(),
            has_fallback_token = fallback_token.is_some(),
            "Persisted storage read"
        );

        Ok(Self::new(session_blob, fallback_token))
    }

    /// Build the `SessionContext` from the stored blob, falling back to the raw token.
    ///
    /// # Errors
    ///
    /// Fails when neither the blob nor the fallback yields a usable token.
    pub fn load_session_context(&self) -> Result<SessionContext, BootstrapError> {
        let fallback = self
            .fallback_token
            .as_ref()
            .filter(|token| !is_blank(token))
            .cloned();

        let blob = match self.session_blob.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match serde_json::from_str::<StoredSessionBlob>(raw) {
                Ok(blob) => Some(blob),
                Err(e) => {
                    if fallback.is_none() {
                        return Err(BootstrapError::CorruptSessionContext(e.to_string()));
                    }
                    warn!(
                        target: "classroom.bootstrap",
                        error = %e,
                        "Stored session blob is corrupt, using fallback token"
                    );
                    None
                }
            },
        };

        let Some(blob) = blob else {
            let access_token = fallback.ok_or(BootstrapError::MissingSessionContext)?;
            return Ok(SessionContext {
                session_id: SessionId::adhoc(),
                access_token,
                host_display_name: DEFAULT_HOST_DISPLAY_NAME.to_string(),
                course_title: DEFAULT_COURSE_TITLE.to_string(),
                local_participant_name: DEFAULT_PARTICIPANT_NAME.to_string(),
            });
        };

        let access_token = blob
            .access_token
            .filter(|token| !is_blank(token))
            .or(fallback)
            .ok_or(BootstrapError::MissingAccessToken)?;

        Ok(SessionContext {
            session_id: non_blank(blob.session_id).map_or_else(SessionId::adhoc, SessionId),
            access_token,
            host_display_name: non_blank(blob.host_name)
                .unwrap_or_else(|| DEFAULT_HOST_DISPLAY_NAME.to_string()),
            course_title: non_blank(blob.course_title)
                .unwrap_or_else(|| DEFAULT_COURSE_TITLE.to_string()),
            local_participant_name: non_blank(blob.participant_name)
                .unwrap_or_else(|| DEFAULT_PARTICIPANT_NAME.to_string()),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_optional(path: &Path) -> Result<Option<String>, BootstrapError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BootstrapError::Storage(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    #[test]
    fn test_full_blob_is_loaded() {
        let storage = PersistedStorage::new(
            Some(
                r#"{"sessionId": "sess-42", "accessToken": "tok-1", "hostName": "Dr. Rao",
                    "courseTitle": "Algebra II", "participantName": "Kim"}"#
                    .to_string(),
            ),
            None,
        );

        let ctx = storage.load_session_context().expect("context");

        assert_eq!(ctx.session_id.as_str(), "sess-42");
        assert_eq!(ctx.access_token.expose_secret(), "tok-1");
        assert_eq!(ctx.host_display_name, "Dr. Rao");
        assert_eq!(ctx.course_title, "Algebra II");
        assert_eq!(ctx.local_participant_name, "Kim");
    }

    #[test]
    fn test_blob_aliases_are_accepted() {
        let storage = PersistedStorage::new(
            Some(r#"{"roomId": "r-1", "authToken": "tok-2", "mentorName": "Lee"}"#.to_string()),
            None,
        );

        let ctx = storage.load_session_context().expect("context");
        assert_eq!(ctx.session_id.as_str(), "r-1");
        assert_eq!(ctx.access_token.expose_secret(), "tok-2");
        assert_eq!(ctx.host_display_name, "Lee");
        assert_eq!(ctx.course_title, DEFAULT_COURSE_TITLE);
    }

    #[test]
    fn test_blob_without_token_uses_fallback() {
        let storage = PersistedStorage::new(
            Some(r#"{"sessionId": "sess-7"}"#.to_string()),
            Some(SecretString::from("fallback-tok")),
        );

        let ctx = storage.load_session_context().expect("context");
        assert_eq!(ctx.session_id.as_str(), "sess-7");
        assert_eq!(ctx.access_token.expose_secret(), "fallback-tok");
    }

    #[test]
    fn test_corrupt_blob_uses_fallback() {
        let storage = PersistedStorage::new(
            Some("{not json".to_string()),
            Some(SecretString::from("fallback-tok")),
        );

        let ctx = storage.load_session_context().expect("context");
        assert!(ctx.session_id.as_str().starts_with("adhoc-"));
        assert_eq!(ctx.access_token.expose_secret(), "fallback-tok");
        assert_eq!(ctx.local_participant_name, DEFAULT_PARTICIPANT_NAME);
    }

    #[test]
    fn test_corrupt_blob_without_fallback_is_terminal() {
        let storage = PersistedStorage::new(Some("{not json".to_string()), None);

        assert!(matches!(
            storage.load_session_context(),
            Err(BootstrapError::CorruptSessionContext(_))
        ));
    }

    #[test]
    fn test_nothing_stored_is_terminal() {
        let storage = PersistedStorage::default();
        assert_eq!(
            storage.load_session_context().unwrap_err(),
            BootstrapError::MissingSessionContext
        );

        let storage = PersistedStorage::new(None, Some(SecretString::from("  ")));
        assert_eq!(
            storage.load_session_context().unwrap_err(),
            BootstrapError::MissingSessionContext
        );
    }

    #[test]
    fn test_blob_with_blank_token_and_no_fallback() {
        let storage =
            PersistedStorage::new(Some(r#"{"sessionId": "s", "accessToken": ""}"#.to_string()), None);

        assert_eq!(
            storage.load_session_context().unwrap_err(),
            BootstrapError::MissingAccessToken
        );
    }

    #[test]
    fn test_context_debug_redacts_token() {
        let storage = PersistedStorage::new(None, Some(SecretString::from("very-secret-token")));
        let ctx = storage.load_session_context().expect("context");

        let debug_output = format!("{ctx:?}");
        assert!(!debug_output.contains("very-secret-token"));
    }

    #[test]
    fn test_from_dir_reads_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(SESSION_BLOB_FILE),
            r#"{"sessionId": "sess-file"}"#,
        )
        .expect("write blob");
        fs::write(dir.path().join(FALLBACK_TOKEN_FILE), "file-token\n").expect("write token");

        let storage = PersistedStorage::from_dir(dir.path()).expect("storage");
        let ctx = storage.load_session_context().expect("context");

        assert_eq!(ctx.session_id.as_str(), "sess-file");
        assert_eq!(ctx.access_token.expose_secret(), "file-token");
    }

    #[test]
    fn test_from_dir_missing_files_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");

        let storage = PersistedStorage::from_dir(dir.path()).expect("storage");
        assert!(storage.session_blob.is_none());
        assert!(storage.fallback_token.is_none());
    }
}

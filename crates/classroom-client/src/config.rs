//! Classroom client configuration.
//!
//! Configuration is loaded from environment variables. The debounce windows
//! and roster heuristics are tuned policy rather than guarantees of the media
//! collaborator, so every one of them can be overridden here.

use common::types::JoinSettings;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default grace window before "all peers vanished" ends the session.
pub const DEFAULT_NO_PEERS_GRACE_MS: u64 = 2000;

/// Default grace window before "tutor vanished" ends the session.
pub const DEFAULT_HOST_LEFT_GRACE_MS: u64 = 1500;

/// Default grace window before "tutor never arrived" ends the session.
pub const DEFAULT_HOST_ABSENT_GRACE_MS: u64 = 3000;

/// Default delay between leaving and redirecting to the dashboard.
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 3000;

/// Default route the participant is sent to once the session is over.
pub const DEFAULT_DASHBOARD_ROUTE: &str = "/student/dashboard";

/// Default role tag identifying the instructor peer.
pub const DEFAULT_TUTOR_ROLE: &str = "tutor";

/// Default display-name markers identifying auxiliary peers.
pub const DEFAULT_AUXILIARY_NAME_MARKERS: &str = "relay,recorder";

/// Default number of join attempts (the first attempt plus one retry).
pub const DEFAULT_MAX_JOIN_ATTEMPTS: u32 = 2;

/// Default upper bound on the teardown `leave()` call.
pub const DEFAULT_TEARDOWN_LEAVE_TIMEOUT_MS: u64 = 2000;

/// Default directory holding the persisted session blob and fallback token.
pub const DEFAULT_STORAGE_DIR: &str = ".classroom";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Policy the leave coordinator applies to the three session-end signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeavePolicy {
    /// Debounce for the "no-peers" timer.
    pub no_peers_grace: Duration,
    /// Debounce for the "host-left" timer.
    pub host_left_grace: Duration,
    /// Debounce for the "host-absent" timer.
    pub host_absent_grace: Duration,
    /// Delay between entering Left and navigating away.
    pub redirect_delay: Duration,
    /// Route navigated to after the session ends.
    pub dashboard_route: String,
    /// Role tag of the instructor peer (case-insensitive).
    pub tutor_role: String,
    /// Lower-cased display-name fragments marking auxiliary peers.
    pub auxiliary_name_markers: Vec<String>,
    /// Only arm "no-peers" and "host-left" while the connection is down.
    pub roster_rules_require_disconnect: bool,
    /// Upper bound on the `leave()` issued at teardown.
    pub teardown_leave_timeout: Duration,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            no_peers_grace: Duration::from_millis(DEFAULT_NO_PEERS_GRACE_MS),
            host_left_grace: Duration::from_millis(DEFAULT_HOST_LEFT_GRACE_MS),
            host_absent_grace: Duration::from_millis(DEFAULT_HOST_ABSENT_GRACE_MS),
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            dashboard_route: DEFAULT_DASHBOARD_ROUTE.to_string(),
            tutor_role: DEFAULT_TUTOR_ROLE.to_string(),
            auxiliary_name_markers: parse_markers(DEFAULT_AUXILIARY_NAME_MARKERS),
            roster_rules_require_disconnect: true,
            teardown_leave_timeout: Duration::from_millis(DEFAULT_TEARDOWN_LEAVE_TIMEOUT_MS),
        }
    }
}

/// Classroom client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Leave coordinator policy.
    pub policy: LeavePolicy,

    /// Media settings used on join.
    pub join_settings: JoinSettings,

    /// Total join attempts allowed (default: 2, i.e. one retry).
    pub max_join_attempts: u32,

    /// Directory holding `session.json` and the fallback `token` file.
    pub storage_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let no_peers_grace =
            parse_millis(vars, "CLASSROOM_NO_PEERS_GRACE_MS", DEFAULT_NO_PEERS_GRACE_MS)?;
        let host_left_grace =
            parse_millis(vars, "CLASSROOM_HOST_LEFT_GRACE_MS", DEFAULT_HOST_LEFT_GRACE_MS)?;
        let host_absent_grace = parse_millis(
            vars,
            "CLASSROOM_HOST_ABSENT_GRACE_MS",
            DEFAULT_HOST_ABSENT_GRACE_MS,
        )?;
        let redirect_delay =
            parse_millis(vars, "CLASSROOM_REDIRECT_DELAY_MS", DEFAULT_REDIRECT_DELAY_MS)?;
        let teardown_leave_timeout = parse_millis(
            vars,
            "CLASSROOM_TEARDOWN_LEAVE_TIMEOUT_MS",
            DEFAULT_TEARDOWN_LEAVE_TIMEOUT_MS,
        )?;

        let dashboard_route = vars
            .get("CLASSROOM_DASHBOARD_ROUTE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DASHBOARD_ROUTE.to_string());
        if !dashboard_route.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "CLASSROOM_DASHBOARD_ROUTE must be an absolute route, got {dashboard_route}"
            )));
        }

        let tutor_role = vars
            .get("CLASSROOM_TUTOR_ROLE")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_TUTOR_ROLE.to_string());
        if tutor_role.is_empty() {
            return Err(ConfigError::InvalidValue(
                "CLASSROOM_TUTOR_ROLE must not be empty".to_string(),
            ));
        }

        let auxiliary_name_markers = parse_markers(
            vars.get("CLASSROOM_AUXILIARY_NAME_MARKERS")
                .map_or(DEFAULT_AUXILIARY_NAME_MARKERS, String::as_str),
        );

        let roster_rules_require_disconnect =
            parse_bool(vars, "CLASSROOM_ROSTER_RULES_REQUIRE_DISCONNECT", true)?;

        let join_settings = JoinSettings {
            audio_muted: parse_bool(vars, "CLASSROOM_JOIN_AUDIO_MUTED", true)?,
            video_muted: parse_bool(vars, "CLASSROOM_JOIN_VIDEO_MUTED", true)?,
        };

        let max_join_attempts = match vars.get("CLASSROOM_MAX_JOIN_ATTEMPTS") {
            Some(raw) => raw.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "CLASSROOM_MAX_JOIN_ATTEMPTS must be a positive integer, got {raw}"
                ))
            })?,
            None => DEFAULT_MAX_JOIN_ATTEMPTS,
        };

        let storage_dir = PathBuf::from(
            vars.get("CLASSROOM_STORAGE_DIR")
                .map_or(DEFAULT_STORAGE_DIR, String::as_str),
        );

        Ok(Config {
            policy: LeavePolicy {
                no_peers_grace,
                host_left_grace,
                host_absent_grace,
                redirect_delay,
                dashboard_route,
                tutor_role,
                auxiliary_name_markers,
                roster_rules_require_disconnect,
                teardown_leave_timeout,
            },
            join_settings,
            max_join_attempts,
            storage_dir,
        })
    }
}

fn parse_millis(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue(format!("{key}={raw}: {e}"))),
        None => Ok(Duration::from_millis(default)),
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(key).map(|s| s.trim().to_ascii_lowercase()) {
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue(format!(
                "{key} must be a boolean, got {raw}"
            ))),
        },
        None => Ok(default),
    }
}

fn parse_markers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config.policy, LeavePolicy::default());
        assert_eq!(config.policy.no_peers_grace, Duration::from_millis(2000));
        assert_eq!(config.policy.host_left_grace, Duration::from_millis(1500));
        assert_eq!(config.policy.host_absent_grace, Duration::from_millis(3000));
        assert_eq!(config.policy.dashboard_route, DEFAULT_DASHBOARD_ROUTE);
        assert_eq!(
            config.policy.auxiliary_name_markers,
            vec!["relay".to_string(), "recorder".to_string()]
        );
        assert!(config.policy.roster_rules_require_disconnect);
        assert_eq!(config.join_settings, JoinSettings::default());
        assert_eq!(config.max_join_attempts, DEFAULT_MAX_JOIN_ATTEMPTS);
        assert_eq!(config.storage_dir, PathBuf::from(DEFAULT_STORAGE_DIR));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            ("CLASSROOM_NO_PEERS_GRACE_MS".to_string(), "5000".to_string()),
            ("CLASSROOM_HOST_LEFT_GRACE_MS".to_string(), "2500".to_string()),
            ("CLASSROOM_REDIRECT_DELAY_MS".to_string(), "0".to_string()),
            ("CLASSROOM_DASHBOARD_ROUTE".to_string(), "/home".to_string()),
            ("CLASSROOM_TUTOR_ROLE".to_string(), " Mentor ".to_string()),
            (
                "CLASSROOM_AUXILIARY_NAME_MARKERS".to_string(),
                "Beam, ,HLS".to_string(),
            ),
            (
                "CLASSROOM_ROSTER_RULES_REQUIRE_DISCONNECT".to_string(),
                "false".to_string(),
            ),
            ("CLASSROOM_JOIN_VIDEO_MUTED".to_string(), "0".to_string()),
            ("CLASSROOM_MAX_JOIN_ATTEMPTS".to_string(), "3".to_string()),
            ("CLASSROOM_STORAGE_DIR".to_string(), "/tmp/cls".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.policy.no_peers_grace, Duration::from_secs(5));
        assert_eq!(config.policy.host_left_grace, Duration::from_millis(2500));
        assert_eq!(config.policy.redirect_delay, Duration::ZERO);
        assert_eq!(config.policy.dashboard_route, "/home");
        assert_eq!(config.policy.tutor_role, "Mentor");
        assert_eq!(
            config.policy.auxiliary_name_markers,
            vec!["beam".to_string(), "hls".to_string()]
        );
        assert!(!config.policy.roster_rules_require_disconnect);
        assert!(config.join_settings.audio_muted);
        assert!(!config.join_settings.video_muted);
        assert_eq!(config.max_join_attempts, 3);
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/cls"));
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let vars = HashMap::from([(
            "CLASSROOM_HOST_LEFT_GRACE_MS".to_string(),
            "soon".to_string(),
        )]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("HOST_LEFT")));
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let vars = HashMap::from([(
            "CLASSROOM_JOIN_AUDIO_MUTED".to_string(),
            "maybe".to_string(),
        )]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_zero_join_attempts_is_rejected() {
        let vars = HashMap::from([("CLASSROOM_MAX_JOIN_ATTEMPTS".to_string(), "0".to_string())]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_relative_dashboard_route_is_rejected() {
        let vars = HashMap::from([(
            "CLASSROOM_DASHBOARD_ROUTE".to_string(),
            "dashboard".to_string(),
        )]);

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}

//! Environment-driven settings for the API server and CLI
//!
//! Every knob has a default so a bare `rpqcheck_api` starts on localhost
//! with a `./data` state directory. Values come from:
//!
//! - `RPQCHECK_ADDR` — socket address to bind (default `127.0.0.1:8080`).
//! - `RPQCHECK_DATA_DIR` — root for persisted state (default `./data`).
//! - `RPQCHECK_CORS_ORIGINS` — comma-separated allowed origins, or `*`
//!   for permissive mode (default: the frontend dev-server origins).

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default allowed CORS origins (frontend dev servers).
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// Resolved runtime settings.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Address the API server binds.
    pub addr: SocketAddr,
    /// Root directory for persisted state.
    pub data_dir: PathBuf,
    /// Comma-separated allowed CORS origins, or `*`.
    pub cors_origins: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let addr = get("RPQCHECK_ADDR")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));
        let data_dir = get("RPQCHECK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let cors_origins =
            get("RPQCHECK_CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_owned());
        Self { addr, data_dir, cors_origins }
    }

    /// Directory holding saved constraint bundles.
    pub fn constraints_dir(&self) -> PathBuf {
        self.data_dir.join("constraints")
    }

    /// Directory holding graph-instance documents.
    pub fn graphs_dir(&self) -> PathBuf {
        self.data_dir.join("graphs")
    }

    /// Marker file recording the active graph instance.
    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("state").join("active_graph")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let s = Settings::from_lookup(|_| None);
        assert_eq!(s.addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(s.data_dir, PathBuf::from("./data"));
        assert_eq!(s.cors_origins, DEFAULT_CORS_ORIGINS);
        assert_eq!(s.constraints_dir(), PathBuf::from("./data/constraints"));
        assert_eq!(s.state_file(), PathBuf::from("./data/state/active_graph"));
    }

    #[test]
    fn environment_overrides_win() {
        let s = Settings::from_lookup(|key| match key {
            "RPQCHECK_ADDR" => Some("0.0.0.0:9901".into()),
            "RPQCHECK_DATA_DIR" => Some("/var/lib/rpqcheck".into()),
            "RPQCHECK_CORS_ORIGINS" => Some("*".into()),
            _ => None,
        });
        assert_eq!(s.addr, "0.0.0.0:9901".parse().unwrap());
        assert_eq!(s.graphs_dir(), PathBuf::from("/var/lib/rpqcheck/graphs"));
        assert_eq!(s.cors_origins, "*");
    }

    #[test]
    fn unparsable_addr_falls_back_to_default() {
        let s = Settings::from_lookup(|key| {
            (key == "RPQCHECK_ADDR").then(|| "not-an-addr".into())
        });
        assert_eq!(s.addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
    }
}

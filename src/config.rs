use std::path::PathBuf;

const DEFAULT_JWT_SECRET: &str = "change-me";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the JSON snapshot file.
    pub data_path: PathBuf,
    pub jwt_secret: String,
    /// Access-token lifetime; renewable by re-login, no refresh rotation.
    pub token_ttl_hours: i64,
    pub members_can_read_any_user: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./data/db.json"),
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            token_ttl_hours: 24,
            members_can_read_any_user: true,
        }
    }
}

impl Config {
    /// Read configuration from `HUDDLE_*` environment variables, falling
    /// back to defaults. Unparseable values fall back silently except for
    /// the secret, which warns when left at the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let jwt_secret =
            std::env::var("HUDDLE_JWT_SECRET").unwrap_or_else(|_| defaults.jwt_secret.clone());
        if jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("HUDDLE_JWT_SECRET not set; using the default development secret");
        }
        Self {
            data_path: std::env::var("HUDDLE_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            jwt_secret,
            token_ttl_hours: std::env::var("HUDDLE_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.token_ttl_hours),
            members_can_read_any_user: std::env::var("HUDDLE_MEMBERS_READ_ANY_USER")
                .ok()
                .map(|s| !matches!(s.as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.members_can_read_any_user),
        }
    }
}

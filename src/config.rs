//! Runtime configuration loaded from environment variables.
//!
//! Four values are mandatory and the process refuses to start without them:
//! the database path, the session-signing secret, and the admin credential
//! pair. Everything else has a fallback.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Connection string for the catalog store. A filesystem path for the
    /// embedded SQLite engine; use ":memory:" for an ephemeral store.
    pub database_path: String,

    /// Secret used to HMAC-sign session cookies.
    pub session_secret: String,

    /// Admin login username.
    pub admin_username: String,

    /// Admin login password. Compared by plain equality.
    pub admin_password: String,

    /// Listening port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Company name shown by the frontend, served via /api/config.
    #[serde(default = "default_company_name")]
    pub company_name: String,

    /// Company icon URL served via /api/config.
    #[serde(default)]
    pub company_icon: String,

    /// Hours before an idle session expires.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

fn default_port() -> u16 {
    4000
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_company_name() -> String {
    "Appdock".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24
}

impl Config {
    /// Load configuration from the environment, reading a .env file first.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values envy accepts but the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_path.is_empty() {
            anyhow::bail!("DATABASE_PATH must not be empty");
        }
        if self.session_secret.is_empty() {
            anyhow::bail!("SESSION_SECRET must not be empty");
        }
        if self.admin_username.is_empty() {
            anyhow::bail!("ADMIN_USERNAME must not be empty");
        }
        if self.admin_password.is_empty() {
            anyhow::bail!("ADMIN_PASSWORD must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_vars() -> Vec<(String, String)> {
        vec![
            ("DATABASE_PATH".to_string(), "/tmp/appdock.db".to_string()),
            ("SESSION_SECRET".to_string(), "s3cret".to_string()),
            ("ADMIN_USERNAME".to_string(), "admin".to_string()),
            ("ADMIN_PASSWORD".to_string(), "hunter2".to_string()),
        ]
    }

    #[test]
    fn test_loads_with_required_vars_only() {
        let config: Config = envy::from_iter(required_vars()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 4000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.company_name, "Appdock");
        assert_eq!(config.company_icon, "");
        assert_eq!(config.session_ttl_hours, 24);
    }

    #[test]
    fn test_missing_required_var_fails() {
        for skip in ["DATABASE_PATH", "SESSION_SECRET", "ADMIN_USERNAME", "ADMIN_PASSWORD"] {
            let vars: Vec<_> = required_vars().into_iter().filter(|(k, _)| k != skip).collect();
            let result = envy::from_iter::<_, Config>(vars);
            assert!(result.is_err(), "expected failure without {}", skip);
        }
    }

    #[test]
    fn test_empty_required_var_rejected_by_validate() {
        let mut vars = required_vars();
        vars[1].1 = String::new();
        let config: Config = envy::from_iter(vars).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_optional_overrides() {
        let mut vars = required_vars();
        vars.push(("PORT".to_string(), "8123".to_string()));
        vars.push(("COMPANY_NAME".to_string(), "Acme Ops".to_string()));
        vars.push(("COMPANY_ICON".to_string(), "https://acme.test/icon.png".to_string()));

        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 8123);
        assert_eq!(config.company_name, "Acme Ops");
        assert_eq!(config.company_icon, "https://acme.test/icon.png");
    }
}

use std::env;
use std::sync::OnceLock;

static JWT_SECRET: OnceLock<String> = OnceLock::new();

/// Process-wide JWT signing secret. Read from the environment on first use
/// and cached; later environment changes are ignored.
pub fn jwt_secret() -> anyhow::Result<&'static str> {
    if let Some(secret) = JWT_SECRET.get() {
        return Ok(secret.as_str());
    }
    let secret = env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
    Ok(JWT_SECRET.get_or_init(|| secret).as_str())
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        // A missing secret should abort startup, not the first login.
        jwt_secret()?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            database_url,
            host,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_secret_is_cached_after_first_read() {
        unsafe { env::set_var("JWT_SECRET", "test-secret") };
        let first = jwt_secret().unwrap();
        unsafe { env::set_var("JWT_SECRET", "changed-later") };
        assert_eq!(jwt_secret().unwrap(), first);
    }
}

use anyhow::Result;
use std::env;

/// Shared-secret config for verifying tokens minted by the external
/// identity provider (HS256). This service never issues production tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;

        if secret.len() < 32 {
            return Err(anyhow::anyhow!("JWT_SECRET must be at least 32 characters"));
        }

        Ok(Self { secret })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secret_rejected() {
        std::env::set_var("JWT_SECRET", "too_short");
        assert!(JwtConfig::from_env().is_err());
        std::env::set_var(
            "JWT_SECRET",
            "a_very_long_secret_key_that_is_at_least_32_chars",
        );
        assert!(JwtConfig::from_env().is_ok());
    }
}

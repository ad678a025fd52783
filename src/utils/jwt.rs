use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static JWT_CONFIG: OnceLock<crate::config::jwt::JwtConfig> = OnceLock::new();

/// Initialize JWT config from environment. Must be called once at startup.
pub fn init_jwt_config(config: crate::config::jwt::JwtConfig) -> Result<()> {
    JWT_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("JWT config already initialized"))?;
    Ok(())
}

fn get_config() -> &'static crate::config::jwt::JwtConfig {
    JWT_CONFIG
        .get()
        .expect("JWT config not initialized — call init_jwt_config() at startup")
}

/// Claims of a token issued by the identity provider. The backend only
/// verifies; it never registers users or refreshes sessions.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // subject id at the identity provider
    pub role: String, // "admin" is the only role with write access here
    pub exp: usize,
    pub iat: usize,
}

pub fn decode_jwt(token: &str) -> Result<Claims> {
    let config = get_config();

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| anyhow::anyhow!("Failed to decode JWT: {}", e))
}

/// Mint a token with the shared secret. The production issuer lives at the
/// identity provider; this is for integration tests and local tooling.
pub fn encode_token(subject: &str, role: &str, ttl_seconds: u64) -> Result<String> {
    let config = get_config();
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: subject.to_owned(),
        role: role.to_owned(),
        exp: now + ttl_seconds as usize,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_config() {
        INIT.call_once(|| {
            std::env::set_var(
                "JWT_SECRET",
                "a_very_long_secret_key_that_is_at_least_32_chars",
            );
            let config = crate::config::jwt::JwtConfig::from_env().unwrap();
            let _ = init_jwt_config(config);
        });
    }

    #[test]
    fn encode_decode_round_trip() {
        ensure_config();
        let token = encode_token("provider-uid-1", "admin", 900).unwrap();
        let claims = decode_jwt(&token).unwrap();
        assert_eq!(claims.sub, "provider-uid-1");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_rejected() {
        ensure_config();
        let token = encode_token("provider-uid-1", "admin", 900).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(decode_jwt(&tampered).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        ensure_config();
        // Validation has a default 60s leeway, so build one already far past.
        let config = get_config();
        let past = chrono::Utc::now().timestamp() as usize - 3600;
        let claims = Claims {
            sub: "x".into(),
            role: "admin".into(),
            exp: past,
            iat: past - 10,
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_jwt(&stale).is_err());
    }
}

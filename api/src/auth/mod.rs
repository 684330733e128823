pub mod claims;
pub mod extractors;
pub mod guards;
pub mod middleware;

pub use claims::{AuthUser, Claims, Role};

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use util::config::AppConfig;

/// Generates a JWT and its expiry timestamp for a given user.
///
/// Issuing tokens is normally another service's job; this exists for local
/// tooling and tests.
pub fn generate_jwt(
    user_id: i64,
    role: Role,
) -> Result<(String, String), jsonwebtoken::errors::Error> {
    let (secret, minutes) = {
        let config = AppConfig::global();
        (config.jwt_secret.clone(), config.jwt_duration_minutes)
    };

    let expiry = Utc::now() + Duration::minutes(minutes as i64);
    let claims = Claims {
        sub: user_id,
        exp: expiry.timestamp() as usize,
        role,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, expiry.to_rfc3339()))
}

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Roles allowed to administer departments.
pub const CONSOLE_ROLES: [&str; 2] = ["Superadmin", "Admin"];

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub role: String,
    pub exp: usize, // Expiration timestamp
}

impl Claims {
    pub fn may_administer_departments(&self) -> bool {
        CONSOLE_ROLES.contains(&self.role.as_str())
    }
}

/// Issues a 7-day console token. Sign-in lives in the identity service; this is
/// the format it hands out.
pub fn generate_token(user_id: &str, role: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (Utc::now() + Duration::days(7)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_role() {
        let token = generate_token("42", "Superadmin", "secret").unwrap();
        let claims = validate_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, "42");
        assert!(claims.may_administer_departments());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token("42", "Admin", "secret").unwrap();
        assert!(validate_token(&token, "other").is_err());
    }

    #[test]
    fn ordinary_roles_cannot_administer() {
        let token = generate_token("42", "Employee", "secret").unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert!(!claims.may_administer_departments());
    }
}

//! JWT token service
//!
//! Issues and validates HS256 tokens. Access and refresh tokens share one
//! claim shape and differ only in TTL. There is no revocation list: any
//! valid, unexpired refresh token can mint a new access token.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::time::Duration;

use crate::application::config::JwtConfig;
use crate::domain::claims::Claims;
use crate::domain::validator::TokenValidator;
use crate::error::TokenError;

pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let secret = config.secret_key.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            config,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn generate_access_token(
        &self,
        user_id: &str,
        email: &str,
        role: &str,
    ) -> Result<String, TokenError> {
        self.generate(user_id, email, role, self.config.access_token_ttl)
    }

    pub fn generate_refresh_token(
        &self,
        user_id: &str,
        email: &str,
        role: &str,
    ) -> Result<String, TokenError> {
        self.generate(user_id, email, role, self.config.refresh_token_ttl)
    }

    /// Issue a token valid from now for `ttl`.
    pub fn generate(
        &self,
        user_id: &str,
        email: &str,
        role: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iss: self.config.issuer.clone(),
            sub: user_id.to_string(),
            aud: vec![self.config.audience.clone()],
            exp: now.saturating_add(ttl_secs),
            nbf: now,
            iat: now,
        };

        self.sign(&claims)
    }

    /// Sign an arbitrary claim set with this service's key.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Verify signature, issuer, audience, `exp` and `nbf`.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Validate a refresh token and issue a fresh access token for the same
    /// identity.
    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<String, TokenError> {
        let claims = self.validate(refresh_token)?;
        self.generate_access_token(&claims.user_id, &claims.email, &claims.role)
    }

    /// Decode the payload without checking signature or expiry.
    ///
    /// Never use the result for an access decision.
    pub fn extract_claims_unverified(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        Ok(data.claims)
    }
}

impl TokenValidator for JwtService {
    fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        JwtService::validate(self, token)
    }
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(JwtConfig::with_secret(secret))
    }

    fn claims_for(service: &JwtService, exp_offset: i64, nbf_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            user_id: "user123".into(),
            email: "user@example.com".into(),
            role: "admin".into(),
            iss: service.config().issuer.clone(),
            sub: "user123".into(),
            aud: vec![service.config().audience.clone()],
            exp: now + exp_offset,
            nbf: now + nbf_offset,
            iat: now - 7200,
        }
    }

    #[test]
    fn test_generate_and_validate() {
        let service = service("secret-a");
        let token = service
            .generate_access_token("user123", "user@example.com", "admin")
            .unwrap();

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.user_id, "user123");
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.iss, "boilerplate");
        assert_eq!(claims.aud, vec!["boilerplate_audience".to_string()]);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn test_refresh_token_uses_refresh_ttl() {
        let service = service("secret-a");
        let token = service
            .generate_refresh_token("user123", "user@example.com", "user")
            .unwrap();

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 86400);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = service("secret-a")
            .generate_access_token("user123", "user@example.com", "user")
            .unwrap();

        let err = service("secret-b").validate(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_expired_token() {
        let service = service("secret-a");
        let token = service.sign(&claims_for(&service, -60, -3600)).unwrap();

        let err = service.validate(&token).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn test_not_yet_valid_token() {
        let service = service("secret-a");
        let token = service.sign(&claims_for(&service, 3600, 600)).unwrap();

        let err = service.validate(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_issuer_and_audience_are_pinned() {
        let service = service("secret-a");

        let mut claims = claims_for(&service, 3600, 0);
        claims.iss = "someone-else".into();
        let token = service.sign(&claims).unwrap();
        assert!(matches!(
            service.validate(&token),
            Err(TokenError::Invalid(_))
        ));

        let mut claims = claims_for(&service, 3600, 0);
        claims.aud = vec!["other_audience".into()];
        let token = service.sign(&claims).unwrap();
        assert!(matches!(
            service.validate(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_garbage_token() {
        let service = service("secret-a");
        for token in ["", "not-a-jwt", "a.b.c"] {
            assert!(matches!(
                service.validate(token),
                Err(TokenError::Invalid(_))
            ));
        }
    }

    #[test]
    fn test_refresh_access_token() {
        let service = service("secret-a");
        let refresh = service
            .generate_refresh_token("user123", "user@example.com", "admin")
            .unwrap();

        let access = service.refresh_access_token(&refresh).unwrap();
        let claims = service.validate(&access).unwrap();
        assert_eq!(claims.user_id, "user123");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_refresh_with_expired_token_fails() {
        let service = service("secret-a");
        let expired = service.sign(&claims_for(&service, -1, -3600)).unwrap();

        assert!(matches!(
            service.refresh_access_token(&expired),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_extract_claims_unverified() {
        let foreign = service("secret-b");
        let local = service("secret-a");
        let token = foreign.sign(&claims_for(&foreign, -60, -3600)).unwrap();

        // neither the signature nor the expiry is checked
        let claims = local.extract_claims_unverified(&token).unwrap();
        assert_eq!(claims.user_id, "user123");

        assert!(local.extract_claims_unverified("not-a-jwt").is_err());
    }
}

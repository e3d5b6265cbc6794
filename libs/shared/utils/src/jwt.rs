use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{Identity, JwtClaims, JwtHeader, Role};

type HmacSha256 = Hmac<Sha256>;

/// Access-token lifetime. Tokens are re-issued at login; there is no
/// refresh flow.
pub const TOKEN_TTL_MINUTES: i64 = 60;

fn sign(input: &str, jwt_secret: &str) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(input.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Issues a signed HS256 bearer token for an authenticated account.
pub fn issue_token(
    account_id: Uuid,
    role: Role,
    email: Option<&str>,
    jwt_secret: &str,
) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let header = JwtHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let claims = JwtClaims {
        sub: account_id.to_string(),
        role,
        email: email.map(|e| e.to_string()),
        iat: now.timestamp() as u64,
        exp: (now + Duration::minutes(TOKEN_TTL_MINUTES)).timestamp() as u64,
    };

    let header_json =
        serde_json::to_string(&header).map_err(|_| "Failed to encode header".to_string())?;
    let claims_json =
        serde_json::to_string(&claims).map_err(|_| "Failed to encode claims".to_string())?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = sign(&signing_input, jwt_secret)?;

    Ok(format!("{}.{}", signing_input, signature))
}

/// Validates a bearer token and resolves the claims into an [`Identity`].
/// Signature, structure, and expiry are checked here; whether the account
/// still exists and is active is the auth middleware's concern.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Identity, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    let now = Utc::now().timestamp() as u64;
    if claims.exp < now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err("Token expired".to_string());
    }

    let account_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| "Invalid subject claim".to_string())?;

    let identity = Identity {
        id: account_id,
        email: claims.email,
        role: claims.role,
    };

    debug!("Token validated successfully for account: {}", identity.id);
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-key-of-reasonable-length";

    #[test]
    fn issued_token_validates_back_to_the_same_identity() {
        let account_id = Uuid::new_v4();
        let token =
            issue_token(account_id, Role::Doctor, Some("doc@clinic.test"), SECRET).unwrap();

        let identity = validate_token(&token, SECRET).unwrap();
        assert_eq!(identity.id, account_id);
        assert_eq!(identity.role, Role::Doctor);
        assert_eq!(identity.email.as_deref(), Some("doc@clinic.test"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), Role::Admin, None, SECRET).unwrap();
        let err = validate_token(&token, "a-different-secret").unwrap_err();
        assert_eq!(err, "Invalid token signature");
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(validate_token("not-a-token", SECRET).is_err());
        assert!(validate_token("a.b", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn empty_secret_is_refused_outright() {
        let token = issue_token(Uuid::new_v4(), Role::Patient, None, SECRET).unwrap();
        assert!(validate_token(&token, "").is_err());
        assert!(issue_token(Uuid::new_v4(), Role::Patient, None, "").is_err());
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        // Token built by hand with a subject that is not an account id.
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();
        let claims = URL_SAFE_NO_PAD.encode(format!(
            r#"{{"sub":"service-account","role":"admin","email":null,"iat":0,"exp":{exp}}}"#
        ));
        let input = format!("{header}.{claims}");
        let signature = sign(&input, SECRET).unwrap();
        let token = format!("{input}.{signature}");

        let err = validate_token(&token, SECRET).unwrap_err();
        assert_eq!(err, "Invalid subject claim");
    }
}

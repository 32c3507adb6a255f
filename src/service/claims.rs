use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const CLAIM_TOKEN_TTL_DAYS: i64 = 7;

/// Why a claim token was rejected. These are values handled by the caller,
/// not errors; the webhook still answers 200 when one occurs mid-pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimDenial {
    MalformedToken,
    Expired { age_days: i64 },
    NotFound,
    AlreadyRedeemed,
}

impl ClaimDenial {
    pub fn message(&self) -> String {
        match self {
            ClaimDenial::MalformedToken => "Invalid claim token".to_string(),
            ClaimDenial::Expired { age_days } => format!(
                "Claim link has expired ({} days old, limit is {} days)",
                age_days, CLAIM_TOKEN_TTL_DAYS
            ),
            ClaimDenial::NotFound => "No reward redemption found".to_string(),
            ClaimDenial::AlreadyRedeemed => "Reward already redeemed".to_string(),
        }
    }

}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTicket {
    pub referral_code: String,
    pub issued_at: DateTime<Utc>,
}

/// Issues and checks the claim-link tokens embedded in milestone emails.
///
/// A token is `base64url(code:millis:sig)` where `sig` is an HMAC-SHA256
/// over `code:millis`. The signature keeps tokens unforgeable even though
/// the referral code inside is guessable.
#[derive(Debug, Clone)]
pub struct ClaimTokenService {
    secret: String,
}

impl ClaimTokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        ClaimTokenService {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, referral_code: &str, issued_at: DateTime<Utc>) -> String {
        let body = format!("{}:{}", referral_code, issued_at.timestamp_millis());
        let signature = self.sign(&body);
        URL_SAFE_NO_PAD.encode(format!("{}:{}", body, signature))
    }

    /// Claim URL the storefront understands; the token comes back on a
    /// later order as the claim note attribute.
    pub fn claim_link(&self, shop_domain: &str, token: &str) -> String {
        format!("https://{}?claim_reward={}", shop_domain, token)
    }

    /// Decodes and checks a token. Ordering matters: structure and
    /// signature first, then the age window. The redemption-record lookup
    /// is the caller's next step.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimTicket, ClaimDenial> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ClaimDenial::MalformedToken)?;
        let decoded = String::from_utf8(raw).map_err(|_| ClaimDenial::MalformedToken)?;

        let mut parts = decoded.splitn(3, ':');
        let (code, millis, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(code), Some(millis), Some(signature)) if !code.is_empty() => {
                (code, millis, signature)
            }
            _ => return Err(ClaimDenial::MalformedToken),
        };

        let expected = self.sign(&format!("{}:{}", code, millis));
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(ClaimDenial::MalformedToken);
        }

        let millis: i64 = millis.parse().map_err(|_| ClaimDenial::MalformedToken)?;
        let issued_at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or(ClaimDenial::MalformedToken)?;

        let age = now.signed_duration_since(issued_at);
        if age > Duration::days(CLAIM_TOKEN_TTL_DAYS) {
            return Err(ClaimDenial::Expired {
                age_days: age.num_days(),
            });
        }

        Ok(ClaimTicket {
            referral_code: code.to_string(),
            issued_at,
        })
    }

    fn sign(&self, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ClaimTokenService {
        ClaimTokenService::new("test-secret")
    }

    #[test]
    fn issued_token_round_trips() {
        let svc = service();
        let issued_at = Utc::now();
        let token = svc.issue("ABC12345", issued_at);

        let ticket = svc.decode(&token, issued_at).unwrap();
        assert_eq!(ticket.referral_code, "ABC12345");
        assert_eq!(ticket.issued_at.timestamp_millis(), issued_at.timestamp_millis());
    }

    #[test]
    fn token_within_window_is_valid() {
        let svc = service();
        let issued_at = Utc::now();
        let token = svc.issue("ABC12345", issued_at);

        let now = issued_at + Duration::days(CLAIM_TOKEN_TTL_DAYS) - Duration::hours(1);
        assert!(svc.decode(&token, now).is_ok());
    }

    #[test]
    fn stale_token_is_expired() {
        let svc = service();
        let issued_at = Utc::now();
        let token = svc.issue("ABC12345", issued_at);

        let now = issued_at + Duration::days(CLAIM_TOKEN_TTL_DAYS + 1);
        match svc.decode(&token, now) {
            Err(ClaimDenial::Expired { age_days }) => assert!(age_days > CLAIM_TOKEN_TTL_DAYS),
            other => panic!("expected Expired, got {:?}", other),
        }
    }

    #[test]
    fn garbage_is_malformed() {
        let svc = service();
        assert_eq!(
            svc.decode("not base64!!!", Utc::now()),
            Err(ClaimDenial::MalformedToken)
        );
        assert_eq!(
            svc.decode(&URL_SAFE_NO_PAD.encode("no-parts"), Utc::now()),
            Err(ClaimDenial::MalformedToken)
        );
    }

    #[test]
    fn tampered_code_fails_signature_check() {
        let svc = service();
        let token = svc.issue("ABC12345", Utc::now());

        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&token).unwrap()).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(decoded.replacen("ABC12345", "ZZZ99999", 1));

        assert_eq!(
            svc.decode(&forged, Utc::now()),
            Err(ClaimDenial::MalformedToken)
        );
    }

    #[test]
    fn unsigned_legacy_shape_is_rejected() {
        let svc = service();
        let legacy = URL_SAFE_NO_PAD.encode(format!("ABC12345:{}", Utc::now().timestamp_millis()));

        assert_eq!(
            svc.decode(&legacy, Utc::now()),
            Err(ClaimDenial::MalformedToken)
        );
    }

    #[test]
    fn claim_link_wraps_the_token() {
        let svc = service();
        let link = svc.claim_link("example.myshopify.com", "tok123");
        assert_eq!(link, "https://example.myshopify.com?claim_reward=tok123");
    }
}

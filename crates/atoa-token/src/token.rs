//! Token issuance and verification.
//!
//! Verification is evaluated fresh on every call, in this order:
//!
//! 1. split and decode the header, reject any algorithm other than ES256
//! 2. resolve the key for the header `kid` and check the signature
//! 3. require `iat` and `exp`, decode the typed claims
//! 4. reject expired and not-yet-valid tokens
//!
//! Only a token that passes all four yields claims. Issuer and audience are
//! checked by [`TokenVerifier::verify_org_token`] and
//! [`TokenVerifier::verify_agent_token`]; [`TokenVerifier::verify_claims`]
//! leaves them to the caller.

use crate::claims::{
    AgentClaims, ClaimSet, OrgClaims, TOKEN_ISSUER, default_token_validity, to_datetime,
};
use crate::clock::{Clock, SystemClock};
use crate::error::TokenError;
use crate::jwt::{self, UnverifiedToken};
use crate::keys::KeyPair;
use crate::resolver::{KeyResolver, StaticKeyResolver};
use atoa_core::{AgentCard, TokenConfig};
use chrono::Duration;
use p256::ecdsa::VerifyingKey;
use serde::Deserialize;
use std::sync::Arc;

/// Presence check for the mandatory temporal claims.
#[derive(Deserialize)]
struct TemporalClaims {
    iat: Option<i64>,
    exp: Option<i64>,
}

/// Verifier for organization and agent tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn Clock>,
    leeway: Duration,
}

impl TokenVerifier {
    /// Create a verifier that trusts a single public key.
    pub fn new(public_key: VerifyingKey) -> Self {
        Self::with_resolver(Arc::new(StaticKeyResolver::new(public_key)))
    }

    /// Create a verifier that looks keys up by `kid`.
    pub fn with_resolver(resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            resolver,
            clock: Arc::new(SystemClock),
            leeway: Duration::zero(),
        }
    }

    /// Use `clock` instead of wall-clock time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Tolerate tokens issued up to `leeway` in the future.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Apply lifetime settings from configuration.
    pub fn configured(self, config: &TokenConfig) -> Self {
        self.with_leeway(config_window(config.leeway_secs))
    }

    /// Verify signature and validity window, returning the decoded claims.
    ///
    /// Issuer and audience are not compared.
    pub fn verify_claims<C: ClaimSet>(&self, token: &str) -> Result<C, TokenError> {
        let unverified = UnverifiedToken::parse(token)?;
        let key = self.resolver.resolve(unverified.header.kid.as_deref())?;
        let payload = unverified.verify(&key)?;

        let temporal: TemporalClaims = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::malformed(format!("payload: {e}")))?;
        let (Some(iat), Some(exp)) = (temporal.iat, temporal.exp) else {
            let claim = if temporal.iat.is_none() { "iat" } else { "exp" };
            return Err(TokenError::MissingClaim { claim });
        };
        if exp <= iat {
            return Err(TokenError::malformed("exp must be after iat"));
        }

        let claims: C = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::malformed(format!("{} claims: {e}", C::KIND)))?;

        let now = self.clock.now().timestamp();
        if now >= exp {
            return Err(TokenError::Expired {
                expired_at: to_datetime(exp),
            });
        }
        if iat > now.saturating_add(self.leeway.num_seconds()) {
            return Err(TokenError::NotYetValid {
                issued_at: to_datetime(iat),
            });
        }

        Ok(claims)
    }

    /// Verify an organization token, including issuer and audience.
    pub fn verify_org_token(&self, token: &str) -> Result<OrgClaims, TokenError> {
        self.verify_expected(token)
    }

    /// Verify an agent token, including issuer and audience.
    pub fn verify_agent_token(&self, token: &str) -> Result<AgentClaims, TokenError> {
        self.verify_expected(token)
    }

    fn verify_expected<C: ClaimSet>(&self, token: &str) -> Result<C, TokenError> {
        let claims = self.verify_claims::<C>(token).inspect_err(|e| {
            tracing::warn!(kind = C::KIND, error = %e, "token rejected");
        })?;
        check_issuer_and_audience(&claims)?;
        Ok(claims)
    }
}

/// Configured seconds as a duration, saturating at the largest representable one.
fn config_window(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Require the platform issuer and the audience of `C`.
pub fn check_issuer_and_audience<C: ClaimSet>(claims: &C) -> Result<(), TokenError> {
    if claims.issuer() != TOKEN_ISSUER {
        return Err(TokenError::IssuerMismatch {
            expected: TOKEN_ISSUER,
            found: claims.issuer().to_string(),
        });
    }
    if claims.audience() != C::AUDIENCE {
        return Err(TokenError::AudienceMismatch {
            expected: C::AUDIENCE,
            found: claims.audience().to_string(),
        });
    }
    Ok(())
}

/// Issues organization tokens and delegated agent tokens.
pub struct TokenIssuer {
    keypair: KeyPair,
    validity: Duration,
    clock: Arc<dyn Clock>,
    resolver: Arc<dyn KeyResolver>,
    leeway: Duration,
}

impl TokenIssuer {
    /// Create an issuer that signs with `keypair` and accepts organization
    /// tokens signed by the same key.
    pub fn new(keypair: KeyPair) -> Self {
        let resolver = Arc::new(StaticKeyResolver::new(keypair.verifying_key()));
        Self {
            keypair,
            validity: default_token_validity(),
            clock: Arc::new(SystemClock),
            resolver,
            leeway: Duration::zero(),
        }
    }

    /// Validity window of issued tokens.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Use `clock` for issuance and for checking presented tokens.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Look up the key of presented organization tokens through `resolver`.
    pub fn with_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Apply lifetime settings from configuration.
    pub fn configured(mut self, config: &TokenConfig) -> Self {
        self.validity = config_window(config.validity_secs);
        self.leeway = config_window(config.leeway_secs);
        self
    }

    /// The signing keypair.
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Verifier for organization tokens presented to this issuer.
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::with_resolver(Arc::clone(&self.resolver))
            .with_clock(Arc::clone(&self.clock))
            .with_leeway(self.leeway)
    }

    /// Issue a token for an organization.
    pub fn issue_org_token(&self, org_id: &str, verified: bool) -> Result<String, TokenError> {
        self.check_validity()?;
        let claims = OrgClaims::new(org_id, verified, self.clock.now(), self.validity);
        let token = jwt::encode(&claims, &self.keypair)?;

        tracing::debug!(org_id, verified, exp = claims.exp, "issued organization token");
        Ok(token)
    }

    /// Issue a token for an agent, delegated from an organization token.
    ///
    /// The card is validated, then `org_token` is fully verified, then its
    /// `org_id` must equal the card's. The agent's `verified` flag comes from
    /// the organization token; the card's own flag is ignored.
    pub fn issue_agent_token(&self, card: &AgentCard, org_token: &str) -> Result<String, TokenError> {
        card.validate()?;
        self.check_validity()?;

        let org_claims = self.verifier().verify_org_token(org_token)?;

        if org_claims.org_id != card.org_id {
            tracing::warn!(
                agent_id = %card.agent_id,
                card_org_id = %card.org_id,
                token_org_id = %org_claims.org_id,
                "refusing agent token: org_id mismatch"
            );
            return Err(TokenError::DelegationMismatch {
                card_org_id: card.org_id.clone(),
                token_org_id: org_claims.org_id,
            });
        }

        let claims = AgentClaims::delegated(card, &org_claims, self.clock.now(), self.validity);
        let token = jwt::encode(&claims, &self.keypair)?;

        tracing::debug!(
            agent_id = %claims.agent_id,
            org_id = %claims.org_id,
            verified = claims.verified,
            "issued agent token"
        );
        Ok(token)
    }

    fn check_validity(&self) -> Result<(), TokenError> {
        if self.validity.num_seconds() <= 0 {
            return Err(TokenError::TokenCreationFailed(
                "validity window must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Issue an organization token with the default validity window.
pub fn issue_organization_token(
    org_id: &str,
    verified: bool,
    keypair: &KeyPair,
) -> Result<String, TokenError> {
    TokenIssuer::new(keypair.clone()).issue_org_token(org_id, verified)
}

/// Issue an agent token against an organization token signed by `keypair`.
pub fn issue_agent_token(
    card: &AgentCard,
    org_token: &str,
    keypair: &KeyPair,
) -> Result<String, TokenError> {
    TokenIssuer::new(keypair.clone()).issue_agent_token(card, org_token)
}

/// Verify an organization token against `public_key` at the current time.
pub fn verify_organization_token(
    token: &str,
    public_key: &VerifyingKey,
) -> Result<OrgClaims, TokenError> {
    TokenVerifier::new(*public_key).verify_org_token(token)
}

/// Verify an agent token against `public_key` at the current time.
pub fn verify_agent_token(
    token: &str,
    public_key: &VerifyingKey,
) -> Result<AgentClaims, TokenError> {
    TokenVerifier::new(*public_key).verify_agent_token(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{AGENT_TOKEN_AUDIENCE, ORG_TOKEN_AUDIENCE};
    use crate::clock::FixedClock;
    use crate::error::ErrorKind;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn issuer_with_clock() -> (TokenIssuer, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(start()));
        let issuer = TokenIssuer::new(KeyPair::generate().unwrap()).with_clock(clock.clone());
        (issuer, clock)
    }

    fn agent_card(org_id: &str) -> AgentCard {
        AgentCard::new("agent-1", org_id, vec!["text".into()])
    }

    #[test]
    fn test_configured_windows_saturate() {
        let config = TokenConfig {
            validity_secs: u64::MAX,
            leeway_secs: 10_000_000_000_000_000,
        };
        let (issuer, _) = issuer_with_clock();
        let issuer = issuer.configured(&config);
        let verifier = TokenVerifier::new(issuer.keypair().verifying_key()).configured(&config);

        let token = issuer.issue_org_token("org-x", true).unwrap();
        let claims = verifier.verify_org_token(&token).unwrap();
        assert_eq!(claims.exp, start().timestamp() + Duration::MAX.num_seconds());
    }

    #[test]
    fn test_audience_array_accepted() {
        let (issuer, _) = issuer_with_clock();
        let iat = start().timestamp();
        let payload = json!({
            "iss": TOKEN_ISSUER,
            "aud": [ORG_TOKEN_AUDIENCE],
            "iat": iat,
            "exp": iat + 60,
            "org_id": "org-x",
            "verified": false,
        });
        let token = jwt::encode(&payload, issuer.keypair()).unwrap();

        let claims = issuer.verifier().verify_org_token(&token).unwrap();
        assert_eq!(claims.aud, ORG_TOKEN_AUDIENCE);

        let err = issuer.verifier().verify_agent_token(&token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedToken);
    }

    #[test]
    fn test_undecodable_signature_is_malformed() {
        let (issuer, _) = issuer_with_clock();
        let token = issuer.issue_org_token("org-x", true).unwrap();
        let (signing_input, _) = token.rsplit_once('.').unwrap();
        let verifier = issuer.verifier();

        for signature in [
            "not*base64!".to_string(),
            URL_SAFE_NO_PAD.encode([7u8; 63]),
            URL_SAFE_NO_PAD.encode([7u8; 65]),
        ] {
            let forged = format!("{signing_input}.{signature}");
            let err = verifier.verify_org_token(&forged).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedToken, "{signature}");
        }
    }

    #[test]
    fn test_issue_and_verify_org_token() {
        let (issuer, _) = issuer_with_clock();
        let token = issuer.issue_org_token("org-x", true).unwrap();

        let claims = issuer.verifier().verify_org_token(&token).unwrap();
        assert_eq!(claims.org_id, "org-x");
        assert!(claims.verified);
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.aud, ORG_TOKEN_AUDIENCE);
        assert_eq!(claims.iat, start().timestamp());
        assert_eq!(claims.exp, start().timestamp() + 3600);
    }

    #[test]
    fn test_issue_agent_token() {
        let (issuer, _) = issuer_with_clock();
        let org_token = issuer.issue_org_token("org-x", true).unwrap();

        let token = issuer
            .issue_agent_token(&agent_card("org-x"), &org_token)
            .unwrap();
        let claims = issuer.verifier().verify_agent_token(&token).unwrap();

        assert_eq!(claims.agent_id, "agent-1");
        assert_eq!(claims.org_id, "org-x");
        assert!(claims.verified);
        assert_eq!(claims.capabilities, vec!["text".to_string()]);
        assert_eq!(claims.aud, AGENT_TOKEN_AUDIENCE);
    }

    #[test]
    fn test_delegation_mismatch() {
        let (issuer, _) = issuer_with_clock();
        let org_token = issuer.issue_org_token("org-x", true).unwrap();

        let err = issuer
            .issue_agent_token(&agent_card("org-y"), &org_token)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DelegationMismatch);
    }

    #[test]
    fn test_invalid_card_rejected_before_token_checks() {
        let (issuer, _) = issuer_with_clock();
        let card = AgentCard::new("agent-1", "org-x", vec![]);

        let err = issuer.issue_agent_token(&card, "garbage").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_expired_org_token_cannot_delegate() {
        let (issuer, clock) = issuer_with_clock();
        let org_token = issuer.issue_org_token("org-x", true).unwrap();

        clock.advance(Duration::seconds(3600));
        let err = issuer
            .issue_agent_token(&agent_card("org-x"), &org_token)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);
    }

    #[test]
    fn test_expiry_boundary() {
        let (issuer, clock) = issuer_with_clock();
        let token = issuer.issue_org_token("org-x", true).unwrap();
        let verifier = issuer.verifier();

        clock.advance(Duration::seconds(3599));
        assert!(verifier.verify_org_token(&token).is_ok());

        clock.advance(Duration::seconds(1));
        let err = verifier.verify_org_token(&token).unwrap_err();
        assert!(matches!(err, TokenError::Expired { .. }));
    }

    #[test]
    fn test_not_yet_valid() {
        let (issuer, clock) = issuer_with_clock();
        let token = issuer.issue_org_token("org-x", true).unwrap();

        clock.advance(Duration::seconds(-30));
        let err = issuer.verifier().verify_org_token(&token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotYetValid);

        let tolerant = issuer.verifier().with_leeway(Duration::seconds(60));
        assert!(tolerant.verify_org_token(&token).is_ok());
    }

    #[test]
    fn test_org_and_agent_tokens_not_interchangeable() {
        let (issuer, _) = issuer_with_clock();
        let org_token = issuer.issue_org_token("org-x", true).unwrap();
        let agent_token = issuer
            .issue_agent_token(&agent_card("org-x"), &org_token)
            .unwrap();
        let verifier = issuer.verifier();

        // An agent token lacks nothing an org token needs, but its audience differs.
        let err = verifier.verify_org_token(&agent_token).unwrap_err();
        assert!(matches!(err, TokenError::AudienceMismatch { .. }));

        let err = verifier.verify_agent_token(&org_token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedToken);

        // An agent token cannot be presented as delegation proof.
        let err = issuer
            .issue_agent_token(&agent_card("org-x"), &agent_token)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimMismatch);
    }

    #[test]
    fn test_missing_temporal_claims_are_malformed() {
        let (issuer, _) = issuer_with_clock();
        let keypair = issuer.keypair().clone();

        let no_exp = jwt::encode(
            &json!({"iss": TOKEN_ISSUER, "aud": ORG_TOKEN_AUDIENCE, "iat": start().timestamp(), "org_id": "org-x", "verified": true}),
            &keypair,
        )
        .unwrap();
        let err = issuer.verifier().verify_org_token(&no_exp).unwrap_err();
        assert!(matches!(err, TokenError::MissingClaim { claim: "exp" }));

        let no_iat = jwt::encode(
            &json!({"iss": TOKEN_ISSUER, "aud": ORG_TOKEN_AUDIENCE, "exp": start().timestamp() + 60, "org_id": "org-x", "verified": true}),
            &keypair,
        )
        .unwrap();
        let err = issuer.verifier().verify_org_token(&no_iat).unwrap_err();
        assert!(matches!(err, TokenError::MissingClaim { claim: "iat" }));
    }

    #[test]
    fn test_exp_not_after_iat_is_malformed() {
        let (issuer, _) = issuer_with_clock();
        let t = start().timestamp();
        let token = jwt::encode(
            &json!({"iss": TOKEN_ISSUER, "aud": ORG_TOKEN_AUDIENCE, "iat": t, "exp": t, "org_id": "org-x", "verified": true}),
            issuer.keypair(),
        )
        .unwrap();

        let err = issuer.verifier().verify_org_token(&token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedToken);
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let (issuer, _) = issuer_with_clock();
        let t = start().timestamp();
        let token = jwt::encode(
            &json!({"iss": "someone.else", "aud": ORG_TOKEN_AUDIENCE, "iat": t, "exp": t + 60, "org_id": "org-x", "verified": true}),
            issuer.keypair(),
        )
        .unwrap();

        let verifier = issuer.verifier();
        let err = verifier.verify_org_token(&token).unwrap_err();
        assert!(matches!(err, TokenError::IssuerMismatch { .. }));

        // verify_claims leaves issuer and audience to the caller
        let claims: OrgClaims = verifier.verify_claims(&token).unwrap();
        assert_eq!(claims.iss, "someone.else");
    }

    #[test]
    fn test_signature_from_other_key_rejected() {
        let (issuer, _) = issuer_with_clock();
        let other = TokenIssuer::new(KeyPair::generate().unwrap());
        let forged_org_token = other.issue_org_token("org-x", true).unwrap();

        let err = issuer
            .issue_agent_token(&agent_card("org-x"), &forged_org_token)
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidSignature));
    }

    #[test]
    fn test_hs256_token_rejected() {
        let (issuer, _) = issuer_with_clock();
        let token = issuer.issue_org_token("org-x", true).unwrap();
        let (_, rest) = token.split_once('.').unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);

        let err = issuer
            .verifier()
            .verify_org_token(&format!("{header}.{rest}"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signature);
    }

    #[test]
    fn test_configured_validity() {
        let clock = Arc::new(FixedClock::new(start()));
        let config = TokenConfig {
            validity_secs: 60,
            leeway_secs: 0,
        };
        let issuer = TokenIssuer::new(KeyPair::generate().unwrap())
            .with_clock(clock.clone())
            .configured(&config);

        let token = issuer.issue_org_token("org-x", false).unwrap();
        let claims = issuer.verifier().verify_org_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_zero_validity_refused() {
        let issuer =
            TokenIssuer::new(KeyPair::generate().unwrap()).with_validity(Duration::zero());
        let err = issuer.issue_org_token("org-x", true).unwrap_err();
        assert!(matches!(err, TokenError::TokenCreationFailed(_)));
    }

    #[test]
    fn test_free_functions() {
        let keypair = KeyPair::generate().unwrap();
        let org_token = issue_organization_token("org-x", false, &keypair).unwrap();
        let org = verify_organization_token(&org_token, &keypair.verifying_key()).unwrap();
        assert!(!org.verified);

        let agent_token = issue_agent_token(&agent_card("org-x"), &org_token, &keypair).unwrap();
        let agent = verify_agent_token(&agent_token, &keypair.verifying_key()).unwrap();
        assert!(!agent.verified);
    }
}

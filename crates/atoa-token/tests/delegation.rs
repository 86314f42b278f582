//! Delegation chain scenarios: organization token, agent token, verification.
//!
//! Run with: cargo test --package atoa-token --test delegation

use atoa_core::{AgentCard, OrgCard, validate_organization_identity};
use atoa_token::{
    AgentClaims, ErrorKind, FixedClock, KeyPair, KeyRing, OrgClaims, TokenError, TokenIssuer,
    TokenVerifier, inspect_token_unverified, sign_challenge, verify_signature,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).unwrap()
}

fn issuer() -> (TokenIssuer, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(start()));
    let issuer = TokenIssuer::new(KeyPair::generate().unwrap()).with_clock(clock.clone());
    (issuer, clock)
}

fn agent(org_id: &str) -> AgentCard {
    AgentCard::new("agent-1", org_id, vec!["text".to_string()])
}

fn assert_matches_schema(instance: &serde_json::Value, schema_src: &str) {
    let schema: serde_json::Value = serde_json::from_str(schema_src).expect("schema must parse");
    let validator = jsonschema::draft202012::options()
        .build(&schema)
        .expect("schema must compile");

    if !validator.is_valid(instance) {
        let mut msgs = Vec::new();
        for (idx, err) in validator.iter_errors(instance).take(20).enumerate() {
            msgs.push(format!("{}: {}", idx + 1, err));
        }
        panic!("claims did not validate: {}", msgs.join("; "));
    }
}

/// Registration handshake, then org token, then agent token.
#[test]
fn test_full_registration_and_delegation() {
    let org_keys = KeyPair::generate().unwrap();
    let card = OrgCard::new(
        "org-x",
        "Org X",
        "org-x.example",
        org_keys.public_key_pem().unwrap(),
    );
    validate_organization_identity(&card).unwrap();

    let challenge = atoa_token::new_challenge();
    let signature = sign_challenge(challenge.as_bytes(), &org_keys).unwrap();
    assert!(verify_signature(challenge.as_bytes(), &signature, &card.public_key).unwrap());

    let (platform, _) = issuer();
    let org_token = platform.issue_org_token(&card.org_id, true).unwrap();
    let agent_token = platform.issue_agent_token(&agent("org-x"), &org_token).unwrap();

    let claims = platform.verifier().verify_agent_token(&agent_token).unwrap();
    assert_eq!(
        claims,
        AgentClaims {
            iss: "atoa.platform".to_string(),
            aud: "atoa.session".to_string(),
            iat: start().timestamp(),
            exp: start().timestamp() + 3600,
            agent_id: "agent-1".to_string(),
            org_id: "org-x".to_string(),
            verified: true,
            capabilities: vec!["text".to_string()],
        }
    );
}

#[test]
fn test_cross_organization_delegation_refused() {
    let (platform, _) = issuer();
    let org_token = platform.issue_org_token("org-x", true).unwrap();

    let err = platform
        .issue_agent_token(&agent("org-y"), &org_token)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DelegationMismatch);
    match err {
        TokenError::DelegationMismatch {
            card_org_id,
            token_org_id,
        } => {
            assert_eq!(card_org_id, "org-y");
            assert_eq!(token_org_id, "org-x");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_verified_flag_is_inherited_not_declared() {
    let (platform, _) = issuer();

    for verified in [true, false] {
        let org_token = platform.issue_org_token("org-x", verified).unwrap();

        // A card claiming the opposite status changes nothing.
        let mut card = agent("org-x");
        card.verified = !verified;

        let token = platform.issue_agent_token(&card, &org_token).unwrap();
        let claims = platform.verifier().verify_agent_token(&token).unwrap();
        assert_eq!(claims.verified, verified);
    }
}

#[test]
fn test_expired_token_rejected_with_valid_signature() {
    let (platform, clock) = issuer();
    let org_token = platform.issue_org_token("org-x", true).unwrap();
    let verifier = platform.verifier();

    clock.advance(Duration::hours(2));

    let err = verifier.verify_org_token(&org_token).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);

    // Same token, earlier clock: still fine.
    clock.set(start());
    assert!(verifier.verify_org_token(&org_token).is_ok());
}

#[test]
fn test_any_single_byte_flip_fails() {
    let (platform, _) = issuer();
    let token = platform.issue_org_token("org-x", true).unwrap();
    let verifier = platform.verifier();

    let bytes = token.as_bytes();
    for i in 0..bytes.len() {
        let mut tampered = bytes.to_vec();
        tampered[i] ^= 0x01;
        let tampered = String::from_utf8(tampered).unwrap();

        assert!(
            verifier.verify_org_token(&tampered).is_err(),
            "flip at byte {i} was accepted"
        );
    }
}

#[test]
fn test_tampered_payload_is_signature_error() {
    let (platform, _) = issuer();
    let token = platform.issue_org_token("org-x", false).unwrap();

    // Re-encode the payload with verified flipped to true.
    let parts: Vec<&str> = token.split('.').collect();
    let info = inspect_token_unverified(&token).unwrap();
    let mut claims: OrgClaims = serde_json::from_value(info.claims).unwrap();
    claims.verified = true;

    use base64::Engine as _;
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .encode(serde_json::to_vec(&claims).unwrap());
    let forged = format!("{}.{}.{}", parts[0], payload, parts[2]);

    let err = platform.verifier().verify_org_token(&forged).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Signature);

    let err = platform
        .issue_agent_token(&agent("org-x"), &forged)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Signature);
}

#[test]
fn test_separate_platform_and_delegation_keys() {
    let clock = Arc::new(FixedClock::new(start()));
    let org_issuer = TokenIssuer::new(KeyPair::generate().unwrap()).with_clock(clock.clone());

    let mut trusted = KeyRing::new();
    trusted.insert(org_issuer.keypair().verifying_key());
    let agent_issuer = TokenIssuer::new(KeyPair::generate().unwrap())
        .with_clock(clock.clone())
        .with_resolver(Arc::new(trusted));

    let org_token = org_issuer.issue_org_token("org-x", true).unwrap();
    let agent_token = agent_issuer
        .issue_agent_token(&agent("org-x"), &org_token)
        .unwrap();

    // The agent token is signed by the agent issuer, not the org issuer.
    let info = inspect_token_unverified(&agent_token).unwrap();
    assert_eq!(info.header.kid.as_deref(), Some(agent_issuer.keypair().key_id()));

    let verifier =
        TokenVerifier::new(agent_issuer.keypair().verifying_key()).with_clock(clock.clone());
    assert_eq!(
        verifier.verify_agent_token(&agent_token).unwrap().org_id,
        "org-x"
    );

    // An org token from an untrusted key is refused.
    let rogue = TokenIssuer::new(KeyPair::generate().unwrap()).with_clock(clock);
    let rogue_token = rogue.issue_org_token("org-x", true).unwrap();
    let err = agent_issuer
        .issue_agent_token(&agent("org-x"), &rogue_token)
        .unwrap_err();
    assert!(matches!(err, TokenError::UnknownKey { .. }));
    assert_eq!(err.kind(), ErrorKind::Signature);
}

#[test]
fn test_verification_is_thread_safe() {
    let (platform, _) = issuer();
    let org_token = platform.issue_org_token("org-x", true).unwrap();
    let verifier = platform.verifier();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..8 {
                    assert_eq!(verifier.verify_org_token(&org_token).unwrap().org_id, "org-x");
                }
            });
        }
    });
}

#[test]
fn test_claims_match_published_schemas() {
    let (platform, _) = issuer();
    let org_token = platform.issue_org_token("org-x", true).unwrap();
    let agent_token = platform.issue_agent_token(&agent("org-x"), &org_token).unwrap();

    let org = inspect_token_unverified(&org_token).unwrap();
    assert_matches_schema(
        &org.claims,
        include_str!("../../../schemas/OrgClaims.schema.json"),
    );

    let agent = inspect_token_unverified(&agent_token).unwrap();
    assert_matches_schema(
        &agent.claims,
        include_str!("../../../schemas/AgentClaims.schema.json"),
    );
}

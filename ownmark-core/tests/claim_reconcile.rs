//! Claim construction and payload reconciliation, end to end.
//!
//! The extractor is simulated by turning a built claim back into the hex
//! payload it would embed.

use ownmark_core::{
    build_claim, compose_check_text, decode, digest_of, normalize_email, normalize_media_id,
    reconcile, reconcile_detailed, resolve_claim_from_free_text, Claim, Digest, ExtractedPayload,
    MediaId, Verdict,
};

const USER_DIGEST: &str = "b4c9a289323b21a01c3e940f150eb9b8c542587f1abfd8f0e1cc1ffc5e475514";

/// Hex payload an extractor would recover from media carrying `claim`.
fn embedded_hex(owner: &Digest, media: Option<&MediaId>) -> String {
    match media {
        Some(id) => format!("{}{}", owner.as_str(), id.as_str()),
        None => owner.as_str().to_string(),
    }
}

fn payload(hex: &str, ecc_ok: bool, match_text_hash: bool) -> ExtractedPayload {
    let mut payload = ExtractedPayload::from_recovered_hex(hex, ecc_ok);
    payload.match_text_hash = match_text_hash;
    payload
}

#[test]
fn test_email_owner_known_digest() {
    assert_eq!(normalize_email(" User@Example.COM "), "user@example.com");

    let owner = digest_of(&normalize_email(" User@Example.COM "));
    assert_eq!(owner.as_str(), USER_DIGEST);

    let claim = build_claim(&owner, None);
    assert_eq!(claim.as_str(), format!("owner:{USER_DIGEST}"));
    assert_eq!(resolve_claim_from_free_text("user@example.com"), claim);
}

#[test]
fn test_roundtrip_recovers_owner_and_media() {
    let owners = [digest_of("a@example.com"), digest_of("b@example.com")];
    let medias = [
        None,
        normalize_media_id(&format!("0x{}", "AB".repeat(32))),
        normalize_media_id(&"1f".repeat(16)),
    ];

    for owner in &owners {
        for media in &medias {
            let claim = build_claim(owner, media.as_ref());
            assert_eq!(claim.owner_digest().as_ref(), Some(owner));
            assert_eq!(claim.media_id(), *media);

            let extracted = payload(&embedded_hex(owner, media.as_ref()), true, false);
            let decoded = decode(&extracted);
            assert_eq!(decoded.owner_digest.as_ref(), Some(owner));
            assert_eq!(decoded.media_id, *media);
            assert_eq!(reconcile(&claim, &extracted), Verdict::Verified);
        }
    }
}

#[test]
fn test_owner_with_media_payload() {
    let claim = resolve_claim_from_free_text(&format!("owner:{}", "a".repeat(64)));
    let result = reconcile_detailed(
        &claim,
        &payload(&format!("{}{}", "a".repeat(64), "b".repeat(64)), true, false),
    );
    assert_eq!(result.verdict, Verdict::Verified);
    assert_eq!(
        result.decoded.media_id.as_ref().map(MediaId::as_str),
        Some("b".repeat(64).as_str())
    );
}

#[test]
fn test_ecc_failure_never_verifies() {
    let claim = build_claim(&digest_of("a@example.com"), None);
    let hex = digest_of("a@example.com").to_string();
    assert_eq!(reconcile(&claim, &payload(&hex, false, false)), Verdict::NotVerified);
    assert_eq!(reconcile(&claim, &payload(&hex, false, true)), Verdict::NotVerified);
}

/// Every combination of extractor flags and payload shape yields a verdict,
/// for claims with and without a parseable owner.
#[test]
fn test_verdict_total_over_grid() {
    let owner_claim = resolve_claim_from_free_text(&format!("owner:{}", "a".repeat(64)));
    let free_claim = resolve_claim_from_free_text("just some text");
    assert!(free_claim.owner_digest().is_none());

    let lengths = [0usize, 64, 128, 100];

    for ecc_ok in [false, true] {
        for match_text_hash in [false, true] {
            for len in lengths {
                let hex = "a".repeat(len);
                let p = payload(&hex, ecc_ok, match_text_hash);
                let structured = ecc_ok && (len == 64 || len == 128);

                for (claim, has_owner) in [(&owner_claim, true), (&free_claim, false)] {
                    let expected = if ecc_ok && match_text_hash {
                        Verdict::VerifiedLegacyTextMatch
                    } else if !structured {
                        Verdict::NotVerified
                    } else if has_owner {
                        Verdict::Verified
                    } else {
                        Verdict::ExtractedUnmatched
                    };
                    assert_eq!(
                        reconcile(claim, &p),
                        expected,
                        "ecc_ok={ecc_ok} match_text_hash={match_text_hash} len={len} owner={has_owner}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_mismatched_owner_not_verified() {
    let claim = build_claim(&digest_of("a@example.com"), None);
    let other = digest_of("b@example.com");
    assert_eq!(
        reconcile(&claim, &payload(other.as_str(), true, false)),
        Verdict::NotVerified
    );
}

#[test]
fn test_pasted_combined_claim_is_respected() {
    let owner = digest_of("user@example.com");
    let pasted_media = "cd".repeat(32);
    let pasted = format!("owner:{owner}|media:{pasted_media}");

    let claim = compose_check_text(&pasted, Some(&"ef".repeat(32)));
    assert_eq!(claim.as_str(), pasted);
    assert_eq!(
        claim.media_id().as_ref().map(MediaId::as_str),
        Some(pasted_media.as_str())
    );
}

#[test]
fn test_invalid_media_id_is_dropped_not_guessed() {
    let claim = compose_check_text("user@example.com", Some("not-hex"));
    assert_eq!(claim.as_str(), format!("owner:{USER_DIGEST}"));

    let short = compose_check_text("user@example.com", Some(&format!("0X{}", "1F".repeat(16))));
    assert_eq!(
        short.as_str(),
        format!("owner:{USER_DIGEST}|media:{}{}", "0".repeat(32), "1f".repeat(16))
    );
}

#[test]
fn test_claim_serializes_as_plain_text() {
    let claim: Claim = serde_json::from_str("\"owner:abc\"").unwrap();
    assert_eq!(claim.as_str(), "owner:abc");
    assert!(claim.owner_digest().is_none());
    assert_eq!(serde_json::to_string(&claim).unwrap(), "\"owner:abc\"");
}

use guard_auth::VerifiedIdentity;

/// Derives the caller's vendor identity from a verified claim set.
///
/// The configured vendor claim wins; the token subject is the fallback.
/// Whitespace-only values count as absent. Pure function of its inputs.
pub fn extract_vendor_id(identity: &VerifiedIdentity, vendor_claim: &str) -> Option<String> {
    identity
        .claim_string(vendor_claim)
        .or_else(|| identity.subject())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn identity(json: Value) -> VerifiedIdentity {
        let Value::Object(claims) = json else {
            panic!("test claims must be a JSON object");
        };
        VerifiedIdentity::from_claims(claims)
    }

    #[test]
    fn configured_claim_wins_over_subject() {
        let id = identity(serde_json::json!({
            "vendorId": "vendor-a",
            "sub": "auth0|123",
        }));
        assert_eq!(
            extract_vendor_id(&id, "vendorId").as_deref(),
            Some("vendor-a")
        );
    }

    #[test]
    fn numeric_claim_is_rendered_as_string() {
        let id = identity(serde_json::json!({"vendorId": 42}));
        assert_eq!(extract_vendor_id(&id, "vendorId").as_deref(), Some("42"));
    }

    #[test]
    fn falls_back_to_subject_when_claim_missing() {
        let id = identity(serde_json::json!({"sub": "auth0|123"}));
        assert_eq!(
            extract_vendor_id(&id, "vendorId").as_deref(),
            Some("auth0|123")
        );
    }

    #[test]
    fn null_claim_falls_back_to_subject() {
        let id = identity(serde_json::json!({"vendorId": null, "sub": "auth0|123"}));
        assert_eq!(
            extract_vendor_id(&id, "vendorId").as_deref(),
            Some("auth0|123")
        );
    }

    #[test]
    fn neither_claim_nor_subject_yields_none() {
        let id = identity(serde_json::json!({"aud": "order-guard"}));
        assert_eq!(extract_vendor_id(&id, "vendorId"), None);
    }

    #[test]
    fn blank_values_count_as_absent() {
        let id = identity(serde_json::json!({"vendorId": "   ", "sub": ""}));
        assert_eq!(extract_vendor_id(&id, "vendorId"), None);
    }
}

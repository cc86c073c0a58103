use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PulseError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        PulseError::unsupported("x")
            .to_string()
            .contains("unsupported feature:")
    );
    assert!(
        PulseError::missing("x")
            .to_string()
            .contains("missing input:")
    );
    assert!(PulseError::encode("x").to_string().contains("encode error:"));
    assert!(
        PulseError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn kind_predicates_match_variants() {
    assert!(PulseError::unsupported("x").is_unsupported());
    assert!(!PulseError::validation("x").is_unsupported());
    assert!(PulseError::missing("x").is_missing_input());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PulseError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

use crate::Digest;

fn sample() -> Digest {
    let mut bytes = [0u8; 32];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = i as u8;
    }
    Digest::from_bytes(bytes)
}

#[test]
fn hex_is_64_lowercase_chars() {
    let hex = sample().to_hex();
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert!(hex.starts_with("000102030405"));
}

#[test]
fn parse_roundtrip() {
    let d = sample();
    assert_eq!(Digest::parse_hex(&d.to_hex()), Some(d));
}

#[test]
fn parse_rejects_bad_input() {
    assert_eq!(Digest::parse_hex("abc"), None);
    assert_eq!(Digest::parse_hex(&"g".repeat(64)), None);
    // Uppercase is not the canonical rendering.
    assert_eq!(Digest::parse_hex(&"AB".repeat(32)), None);
}

#[test]
fn serde_as_hex_string() {
    let d = sample();
    let json = serde_json::to_string(&d).unwrap();
    assert_eq!(json, format!("\"{}\"", d.to_hex()));
    let back: Digest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, d);
}

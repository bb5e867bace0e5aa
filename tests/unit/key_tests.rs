// Cache key derivation through the public validation API

use openimg::cache::{derive_key, RequestKind, CACHE_KEY_LEN};
use openimg::image_optimizer::{validate, TransformParams};
use rstest::rstest;

const URL: &str = "https://example.com/photos/cat.jpg";

fn key_for(params: &TransformParams) -> String {
    let request = params.validate().expect("params should validate");
    derive_key(&request, RequestKind::Transform).to_string()
}

#[test]
fn test_equal_requests_share_a_key() {
    let a = TransformParams::new(URL).with_size(400, 300).with_format("webp");
    let b = TransformParams::new(URL).with_size(400, 300).with_format("webp");
    assert_eq!(key_for(&a), key_for(&b));
}

#[test]
fn test_format_aliases_share_a_key() {
    let jpg = TransformParams::new(URL).with_format("jpg");
    let jpeg = TransformParams::new(URL).with_format("JPEG");
    assert_eq!(key_for(&jpg), key_for(&jpeg));
}

#[rstest]
#[case(TransformParams::new(URL).with_size(401, 300))]
#[case(TransformParams::new(URL).with_size(400, 301))]
#[case(TransformParams::new(URL).with_size(400, 300).with_quality(80))]
#[case(TransformParams::new(URL).with_size(400, 300).with_format("png"))]
#[case(TransformParams::new(URL).with_size(400, 300).with_fit("cover"))]
#[case(TransformParams::new("https://example.com/photos/dog.jpg").with_size(400, 300))]
fn test_any_parameter_change_changes_the_key(#[case] other: TransformParams) {
    let base = TransformParams::new(URL).with_size(400, 300);
    assert_ne!(key_for(&base), key_for(&other));
}

#[test]
fn test_transform_and_placeholder_keys_differ() {
    let request = validate(URL, 40, 0, 20, "", "").unwrap();
    assert_ne!(
        derive_key(&request, RequestKind::Transform),
        derive_key(&request, RequestKind::Placeholder)
    );
}

#[test]
fn test_keys_are_fixed_length_and_file_name_safe() {
    let long_url = format!("https://example.com/{}?a=1&b=2#frag", "x".repeat(4000));
    let key = key_for(&TransformParams::new(long_url).with_size(10, 10));
    assert_eq!(key.len(), CACHE_KEY_LEN);
    assert!(key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

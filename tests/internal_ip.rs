use analytical::{is_internal_ip, Context, Request, Settings};
use proptest::prelude::*;

fn ctx_from(addr: &str) -> Context {
    Context::new().with_request(Request::from_remote_addr(addr))
}

#[test]
fn test_no_request_is_not_internal() {
    let settings = Settings::new().with("ANALYTICAL_INTERNAL_IPS", vec!["1.1.1.1"]);
    assert!(!is_internal_ip(&Context::new(), &settings, None));
}

#[test]
fn test_empty_analytical_list_overrides_internal_ips() {
    let settings = Settings::new()
        .with("INTERNAL_IPS", vec!["1.1.1.1"])
        .with("ANALYTICAL_INTERNAL_IPS", Vec::<String>::new());
    assert!(!is_internal_ip(&ctx_from("1.1.1.1"), &settings, None));
}

#[test]
fn test_internal_ip() {
    let settings = Settings::new().with("ANALYTICAL_INTERNAL_IPS", vec!["1.1.1.1"]);
    assert!(is_internal_ip(&ctx_from("1.1.1.1"), &settings, None));
}

#[test]
fn test_prefix_internal_ip() {
    let settings = Settings::new().with("TEST_INTERNAL_IPS", vec!["1.1.1.1"]);
    assert!(is_internal_ip(&ctx_from("1.1.1.1"), &settings, Some("TEST")));
    // the per-service list is only consulted for its own prefix
    assert!(!is_internal_ip(&ctx_from("1.1.1.1"), &settings, None));
}

#[test]
fn test_internal_ip_fallback() {
    let settings = Settings::new().with("INTERNAL_IPS", vec!["1.1.1.1"]);
    assert!(is_internal_ip(&ctx_from("1.1.1.1"), &settings, None));
    assert!(is_internal_ip(&ctx_from("1.1.1.1"), &settings, Some("TEST")));
}

#[test]
fn test_internal_ip_forwarded_for() {
    let settings = Settings::new().with("ANALYTICAL_INTERNAL_IPS", vec!["1.1.1.1"]);
    let ctx = Context::new().with_request(Request::from_forwarded_for("1.1.1.1"));
    assert!(is_internal_ip(&ctx, &settings, None));
}

#[test]
fn test_forwarded_for_beats_remote_addr() {
    let settings = Settings::new().with("ANALYTICAL_INTERNAL_IPS", vec!["1.1.1.1"]);
    let mut req = Request::from_forwarded_for("2.2.2.2, 1.1.1.1");
    req.remote_addr = Some("1.1.1.1".into());
    let ctx = Context::new().with_request(req);
    assert!(!is_internal_ip(&ctx, &settings, None));
}

#[test]
fn test_different_internal_ip() {
    let settings = Settings::new().with("ANALYTICAL_INTERNAL_IPS", vec!["1.1.1.1"]);
    assert!(!is_internal_ip(&ctx_from("2.2.2.2"), &settings, None));
}

#[test]
fn test_no_settings_nobody_is_internal() {
    assert!(!is_internal_ip(&ctx_from("127.0.0.1"), &Settings::new(), None));
}

fn ip() -> impl Strategy<Value = String> {
    (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
        .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
}

proptest! {
    #[test]
    fn internal_iff_listed(list in prop::collection::vec(ip(), 0..8), addr in ip(), level in 0usize..3) {
        let key = ["TEST_INTERNAL_IPS", "ANALYTICAL_INTERNAL_IPS", "INTERNAL_IPS"][level];
        let settings = Settings::new().with(key, list.clone());
        let expected = list.contains(&addr);
        prop_assert_eq!(is_internal_ip(&ctx_from(&addr), &settings, Some("TEST")), expected);
    }
}

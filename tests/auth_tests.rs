mod common;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{Duration, TimeZone, Utc};
use http::Method;
use proptest::prelude::*;
use webdispatch::auth::{password, TicketCodec, TicketConfig, TicketError, TicketMode};
use webdispatch::filter::Filter;
use webdispatch::Request;

fn codec_with(mode: TicketMode, key_len: usize) -> TicketCodec {
    let key: Vec<u8> = (0..key_len as u8).map(|b| b.wrapping_mul(37)).collect();
    TicketCodec::new(TicketConfig::new(key).with_mode(mode)).unwrap()
}

#[test]
fn test_every_key_size_round_trips() {
    for mode in [TicketMode::KeyDerivedIv, TicketMode::RandomIv] {
        for len in [16, 24, 32] {
            let codec = codec_with(mode, len);
            let token = codec.signin("user").unwrap();
            assert_eq!(codec.authenticate_token(&token).as_deref(), Some("user"), "{mode:?}/{len}");
        }
    }
}

#[test]
fn test_random_iv_tickets_differ_for_same_input() {
    let codec = codec_with(TicketMode::RandomIv, 16);
    let now = Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap();
    let a = codec.generate_token_at("same", 10, now).unwrap();
    let b = codec.generate_token_at("same", 10, now).unwrap();
    assert_ne!(a, b);
    assert_eq!(a.len(), b.len());
}

#[test]
fn test_default_signin_expiry_is_two_weeks() {
    let codec = common::codec();
    let now = Utc::now();
    let token = codec.signin("u").unwrap();
    assert!(codec
        .authenticate_token_at(&token, now + Duration::days(13))
        .is_some());
    assert!(codec
        .authenticate_token_at(&token, now + Duration::days(14) + Duration::minutes(1))
        .is_none());
}

#[test]
fn test_user_data_with_separator_is_rejected() {
    let codec = common::codec();
    assert_eq!(codec.signin("a|b").unwrap_err(), TicketError::InvalidUserData);
}

#[test]
fn test_tampered_ticket_is_rejected() {
    let codec = common::codec();
    let token = codec.signin("alice").unwrap();
    let mut bytes = hex::decode(&token).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    bytes[3] ^= 0x10;
    assert_eq!(codec.authenticate_token(&hex::encode(bytes)), None);
}

#[test]
fn test_filter_reads_basic_credentials() {
    let codec = common::codec();
    let token = codec.signin("42").unwrap();
    let header = format!("Basic {}", BASE64_STANDARD.encode(format!("{token}:x")));

    let mut req = Request::new(Method::GET, "/").with_header("Authorization", header);
    assert!(codec.filter(&mut req, None).is_none());
    assert_eq!(req.user_data, "42");
}

#[test]
fn test_filter_rejects_expired_ticket() {
    let codec = common::codec();
    let issued = Utc::now() - Duration::minutes(10);
    let token = codec.generate_token_at("42", 5, issued).unwrap();
    let mut req = Request::new(Method::GET, "/").with_header("authorization", format!("Bearer {token}"));
    let res = codec.filter(&mut req, None).unwrap();
    assert_eq!(res.status, 401);
    assert!(req.user_data.is_empty());
}

#[test]
fn test_codec_hash_uses_configured_cost() {
    let codec = TicketCodec::new(TicketConfig::new(common::KEY.to_vec()).with_bcrypt_cost(5)).unwrap();
    let salt = codec.salt();
    let hash = codec.hash("pw", &salt).unwrap();
    assert!(hash.starts_with("$2b$05$"));
    assert!(password::matches("pw", &hash));
    assert_eq!(codec.hash("pw", &salt).unwrap(), hash);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ticket_round_trip(user in "[^|]{0,64}", minutes in 1i64..100_000) {
        let codec = common::codec();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let token = codec.generate_token_at(&user, minutes, now).unwrap();
        prop_assert_eq!(
            codec.authenticate_token_at(&token, now + Duration::minutes(minutes) - Duration::seconds(1)),
            Some(user.clone())
        );
        prop_assert_eq!(codec.authenticate_token_at(&token, now + Duration::minutes(minutes)), None);
    }

    #[test]
    fn prop_garbage_never_authenticates(token in "[0-9a-f]{0,200}") {
        let codec = codec_with(TicketMode::RandomIv, 32);
        prop_assert!(codec.authenticate_token(&token).is_none());
    }
}

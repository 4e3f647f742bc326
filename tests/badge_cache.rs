//! Integration tests for the badge cache: coalescing, TTL, failure eviction,
//! and consumer cancellation.
//!
//! Each test runs its own mock provenance service. Request counts are
//! asserted through wiremock expectations, verified when the server drops.

use provenance_feed::http::build_client;
use provenance_feed::provenance::{BadgeCache, EntryStatus, Grade, ProvenanceClient, SourceKey};
use serde_json::json;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NYT_BADGE_PATH: &str = "/api/v1/badge/source/nyt";

fn badge_body(key: &str, grade: &str) -> serde_json::Value {
    json!({
        "source_key": key,
        "grade": grade,
        "grade_pretty": "A+",
        "provisional": false,
        "label": "Provenance grade A+",
        "href": format!("http://127.0.0.1:8010/source/{key}"),
    })
}

fn cache_for(server: &MockServer, ttl: Duration) -> BadgeCache {
    let client = ProvenanceClient::new(
        build_client(None).unwrap(),
        Url::parse(&server.uri()).unwrap(),
    );
    BadgeCache::with_ttl(client, ttl)
}

fn nyt() -> SourceKey {
    SourceKey::new("nyt").unwrap()
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test]
async fn test_concurrent_gets_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(badge_body("nyt", "A_PLUS"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_secs(600));
    let key = nyt();

    let (a, b) = tokio::join!(cache.get(&key), cache.get(&key));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, b);
    assert_eq!(a.grade, Grade::APlus);
    assert_eq!(cache.peek(&key), Some(EntryStatus::Fresh));
}

#[tokio::test]
async fn test_distinct_keys_fetch_independently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(badge_body("nyt", "A")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/badge/source/bbc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(badge_body("bbc", "MYSTERY")))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_secs(600));
    let bbc = SourceKey::new("bbc").unwrap();
    let nyt_key = nyt();

    let (a, b) = tokio::join!(cache.get(&nyt_key), cache.get(&bbc));
    assert_eq!(a.unwrap().grade, Grade::A);
    // Unrecognised grades decode as Unknown.
    assert_eq!(b.unwrap().grade, Grade::Unknown);
    assert_eq!(cache.len(), 2);
}

// ============================================================================
// TTL
// ============================================================================

#[tokio::test]
async fn test_fresh_hit_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(badge_body("nyt", "B")))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_secs(600));
    assert_eq!(cache.cached(&nyt()), None);
    let first = cache.get(&nyt()).await.unwrap();
    let second = cache.get(&nyt()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.cached(&nyt()), Some(first));
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(badge_body("nyt", "C")))
        .expect(2)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_millis(50));
    cache.get(&nyt()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.peek(&nyt()), Some(EntryStatus::Expired));
    assert_eq!(cache.cached(&nyt()), None);

    let refreshed = cache.get(&nyt()).await.unwrap();
    assert_eq!(refreshed.grade, Grade::C);
    assert_eq!(cache.peek(&nyt()), Some(EntryStatus::Fresh));
}

// ============================================================================
// Failure
// ============================================================================

#[tokio::test]
async fn test_failure_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(badge_body("nyt", "D")))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_secs(600));

    let err = cache.get(&nyt()).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(cache.peek(&nyt()), None);

    let badge = cache.get(&nyt()).await.unwrap();
    assert_eq!(badge.grade, Grade::D);
}

#[tokio::test]
async fn test_malformed_badge_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_secs(600));
    assert!(cache.get(&nyt()).await.is_err());
    assert!(cache.is_empty());
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_aborted_consumer_does_not_break_others() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(badge_body("nyt", "A_PLUS"))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_secs(600));

    let first = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&nyt()).await })
    };
    let second = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&nyt()).await })
    };

    // Let both consumers register before cancelling one.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(cache.peek(&nyt()), Some(EntryStatus::InFlight));
    first.abort();

    let badge = second.await.unwrap().unwrap();
    assert_eq!(badge.grade, Grade::APlus);
    assert!(first.await.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn test_dropped_sole_consumer_still_populates_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NYT_BADGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(badge_body("nyt", "B"))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = cache_for(&server, Duration::from_secs(600));

    let consumer = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get(&nyt()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    consumer.abort();

    // The fetch keeps running and lands in the cache.
    for _ in 0..50 {
        if cache.peek(&nyt()) == Some(EntryStatus::Fresh) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cache.peek(&nyt()), Some(EntryStatus::Fresh));

    // Served from cache: the mock still expects exactly one request.
    assert_eq!(cache.get(&nyt()).await.unwrap().grade, Grade::B);
}

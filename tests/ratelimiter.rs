use std::sync::Arc;
use std::time::Duration;

use bucketgate::ratelimit::RouteKey;
use bucketgate::{Ratelimiter, RequestThrottle, ThrottleConfig, ThrottleError};
use http::{HeaderMap, HeaderValue};
use tokio::time::Instant;
use tokio_test::{assert_pending, assert_ready_ok};

const MESSAGES: &str = "/channels/123456789012345678/messages";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn bucket_headers(bucket: &str, limit: &str, reset_after: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-bucket", HeaderValue::from_str(bucket).unwrap());
    headers.insert("x-ratelimit-limit", HeaderValue::from_str(limit).unwrap());
    headers.insert(
        "x-ratelimit-reset-after",
        HeaderValue::from_str(reset_after).unwrap(),
    );
    headers
}

fn global_headers(reset_after: &str) -> HeaderMap {
    let mut headers = bucket_headers("global", "50", reset_after);
    headers.insert("x-ratelimit-global", HeaderValue::from_static("true"));
    headers
}

#[tokio::test(start_paused = true)]
async fn test_first_response_discovers_bucket() {
    init_tracing();
    let limiter = Ratelimiter::new();

    limiter.update(MESSAGES, &bucket_headers("b1", "5", "10"));

    let registry = limiter.registry();
    assert!(registry.bucket_exists("b1"));
    let key = RouteKey::new("123456789012345678:messages");
    assert_eq!(registry.bucket_for(&key).as_deref(), Some("b1"));

    let (bucket, id) = registry.lookup(MESSAGES).unwrap();
    assert_eq!(id, "b1");
    assert_eq!(bucket.capacity(), 5);

    // Four tokens remain after the discovering request
    let start = Instant::now();
    for _ in 0..4 {
        limiter.limit(MESSAGES).await.unwrap();
    }
    assert_eq!(start.elapsed(), Duration::ZERO);

    // One token every two seconds from here on
    limiter.limit(MESSAGES).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_other_messages_share_route() {
    let limiter = Ratelimiter::new();
    limiter.update(MESSAGES, &bucket_headers("b1", "1", "3"));

    let start = Instant::now();
    limiter
        .limit("/channels/123456789012345678/messages/998877665544332211")
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_global_limit_blocks_every_route() {
    let limiter = Ratelimiter::new();
    limiter.update(MESSAGES, &global_headers("5"));
    assert_eq!(limiter.registry().bucket_count(), 0);

    let start = Instant::now();
    limiter.limit("/guilds/123456789012345678/members").await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(5));

    // The cooldown has passed
    let start = Instant::now();
    limiter.limit(MESSAGES).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_global_limit_holds_pending_request() {
    let limiter = Ratelimiter::new();
    limiter.update(MESSAGES, &global_headers("5"));

    let mut request = tokio_test::task::spawn(limiter.limit(MESSAGES));
    assert_pending!(request.poll());

    tokio::time::advance(Duration::from_secs(4)).await;
    assert_pending!(request.poll());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_ready_ok!(request.poll());
}

#[tokio::test(start_paused = true)]
async fn test_global_limit_precedes_bucket() {
    let limiter = Ratelimiter::new();
    limiter.update(MESSAGES, &bucket_headers("b1", "1", "2"));
    limiter.update(MESSAGES, &global_headers("10"));

    let start = Instant::now();
    limiter.limit(MESSAGES).await.unwrap();
    // The bucket refilled while waiting on the global cooldown
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_headers_leave_state_unchanged() {
    let limiter = Ratelimiter::new();
    limiter.update(MESSAGES, &bucket_headers("b1", "5", "10"));

    limiter.update("/guilds/123456789012345678", &bucket_headers("b2", "many", "10"));
    limiter.update("/guilds/123456789012345678", &bucket_headers("b2", "5", ""));

    assert_eq!(limiter.registry().bucket_count(), 1);
    assert_eq!(limiter.registry().route_count(), 1);
    assert!(!limiter.registry().bucket_exists("b2"));
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_bucket() {
    let limiter = Ratelimiter::new();
    limiter.update(MESSAGES, &bucket_headers("b1", "-1", "10"));

    let err = limiter.limit(MESSAGES).await.unwrap_err();
    assert!(matches!(err, ThrottleError::Unavailable { .. }));
    assert_eq!(err.to_string(), "Rate limit bucket b1 is unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_get_successive_slots() {
    let limiter = Arc::new(Ratelimiter::new());
    limiter.update(MESSAGES, &bucket_headers("b1", "1", "1"));

    let start = Instant::now();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.limit(MESSAGES).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Slots at one, two and three seconds
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_throttle_trait_object() {
    let throttle: Arc<dyn RequestThrottle> = Arc::new(Ratelimiter::new());
    throttle.update(MESSAGES, &bucket_headers("b1", "1", "2"));

    let start = Instant::now();
    throttle.limit(MESSAGES).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_configured_limiter() {
    let config = ThrottleConfig::from_yaml(
        r#"
routes:
  skip_segments: 1
  major_keywords:
    - channels
"#,
    )
    .unwrap();
    let limiter = Ratelimiter::with_config(config);
    limiter.update(MESSAGES, &bucket_headers("b1", "5", "10"));

    let key = RouteKey::new("channels:123456789012345678:messages");
    assert!(limiter.registry().mapping_exists(&key));
}

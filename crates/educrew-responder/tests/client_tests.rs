//! Spacing and retry behavior of the shared upstream client.

use educrew_core::{CrewError, Language};
use educrew_responder::{
    GenerationRequest, OfflineResponder, RateLimitedClient, ResponderError, RetryPolicy,
};
use educrew_testing::ScriptedResponder;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn client(responder: &ScriptedResponder) -> RateLimitedClient {
    RateLimitedClient::new(Arc::new(responder.clone()), RetryPolicy::default())
}

fn request() -> GenerationRequest {
    GenerationRequest::new("hi", Language::Es)
}

fn assert_spaced(calls: &[Instant], min_gap: Duration) {
    for pair in calls.windows(2) {
        assert!(
            pair[1] - pair[0] >= min_gap,
            "calls {:?} apart, expected at least {:?}",
            pair[1] - pair[0],
            min_gap
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_sequential_calls_are_spaced() {
    let responder = ScriptedResponder::new();
    let client = client(&responder);

    let started = Instant::now();
    for _ in 0..5 {
        client.call(&request()).await.unwrap();
    }
    assert!(started.elapsed() >= Duration::from_millis(4 * 2000));
    assert_spaced(&responder.calls(), RetryPolicy::default().min_interval());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_spacing() {
    let responder = ScriptedResponder::new();
    let client = Arc::new(client(&responder));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.call(&request()).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "ok");
    }

    let calls = responder.calls();
    assert_eq!(calls.len(), 5);
    assert_spaced(&calls, RetryPolicy::default().min_interval());
}

#[tokio::test(start_paused = true)]
async fn test_throttle_retries_then_surfaces_throttled() {
    let responder = ScriptedResponder::new().throttle().throttle().throttle();
    let err = client(&responder).call(&request()).await.unwrap_err();
    assert_eq!(err, CrewError::UpstreamThrottled { attempts: 3 });

    let calls = responder.calls();
    assert_eq!(calls.len(), 3);
    let first_wait = calls[1] - calls[0];
    let second_wait = calls[2] - calls[1];
    assert!(first_wait >= Duration::from_secs(20));
    assert!(second_wait >= Duration::from_secs(40));
    assert!(second_wait > first_wait);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_failure() {
    let responder = ScriptedResponder::new()
        .fail(ResponderError::failed("503"))
        .reply("hola");

    let text = client(&responder).call(&request()).await.unwrap();
    assert_eq!(text, "hola");
    let calls = responder.calls();
    // 1s linear step is shorter than the 2s spacing
    let gap = calls[1] - calls[0];
    assert!(gap >= Duration::from_secs(2) && gap < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_non_throttle_exhaustion_reports_failure_reason() {
    let responder = ScriptedResponder::new()
        .fail(ResponderError::failed("a"))
        .fail(ResponderError::failed("b"))
        .fail(ResponderError::failed("c"));
    let err = client(&responder).call(&request()).await.unwrap_err();
    assert_eq!(
        err,
        CrewError::UpstreamFailure {
            attempts: 3,
            reason: "c".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_connection_probe() {
    assert!(client(&ScriptedResponder::new()).test_connection().await);

    let down = RateLimitedClient::new(Arc::new(OfflineResponder), RetryPolicy::default());
    assert!(!down.test_connection().await);
}

//! Integration tests for the async coordinators.
//!
//! Time is paused: sleeps advance the tokio clock instantly once every task
//! is idle, so debounce windows and slow remotes are exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use formwork_engine::{AsyncValidation, FieldValue, OptionsLoader, RemoteError, SelectOption};
use formwork_runtime::{
    AsyncValidationCoordinator, OptionsCache, OptionsCacheConfig, OptionsCoordinator,
    LOAD_FAILED_MESSAGE, VALIDATION_FAILED_MESSAGE,
};
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Validator that records every value it is called with, takes `latency`
/// to answer, and rejects anything but "ok".
fn recording_validator(
    latency: Duration,
    debounce_ms: u64,
) -> (AsyncValidation, Arc<Mutex<Vec<FieldValue>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    let validator = move |value: FieldValue| {
        recorder.lock().unwrap().push(value.clone());
        async move {
            sleep(latency).await;
            let error = match value.as_str() {
                Some("ok") => None,
                other => Some(format!("rejected {}", other.unwrap_or("?"))),
            };
            Ok::<_, RemoteError>(error)
        }
    };

    (
        AsyncValidation::new(Arc::new(validator)).with_debounce_ms(debounce_ms),
        seen,
    )
}

fn counting_loader(
    options: Vec<SelectOption>,
    latency: Duration,
) -> (Arc<dyn OptionsLoader>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let loader = move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let options = options.clone();
        async move {
            sleep(latency).await;
            Ok::<_, RemoteError>(options)
        }
    };

    (Arc::new(loader), calls)
}

fn countries() -> Vec<SelectOption> {
    vec![
        SelectOption::new("India", "in"),
        SelectOption::new("USA", "us"),
    ]
}

fn cache() -> Arc<OptionsCache> {
    OptionsCache::new_shared(OptionsCacheConfig::default())
}

// ============================================================================
// Async Validation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn debounce_coalesces_rapid_updates() {
    let (config, seen) = recording_validator(ms(50), 300);
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));

    for value in ["a", "al", "ali", "alic", "alice"] {
        coordinator.update(value.into(), true);
        sleep(ms(100)).await;
    }
    sleep(ms(1000)).await;

    assert_eq!(*seen.lock().unwrap(), vec![FieldValue::from("alice")]);
    assert_eq!(coordinator.error().as_deref(), Some("rejected alice"));
}

#[tokio::test(start_paused = true)]
async fn validator_waits_for_full_debounce() {
    let (config, seen) = recording_validator(ms(10), 300);
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));

    coordinator.update("ok".into(), true);
    sleep(ms(299)).await;
    assert!(seen.lock().unwrap().is_empty());

    sleep(ms(2)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(coordinator.state().validating);

    sleep(ms(20)).await;
    assert!(!coordinator.state().validating);
    assert_eq!(coordinator.error(), None);
}

#[tokio::test(start_paused = true)]
async fn superseded_request_never_publishes() {
    let (config, seen) = recording_validator(ms(500), 300);
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));

    // First request goes out at 300ms and would answer at 800ms
    coordinator.update("first".into(), true);
    sleep(ms(350)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);

    // Second request goes out at 650ms and answers at 1150ms
    coordinator.update("second".into(), true);
    sleep(ms(500)).await;
    assert_eq!(coordinator.error(), None);

    sleep(ms(400)).await;
    assert_eq!(coordinator.error().as_deref(), Some("rejected second"));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn disabling_clears_error_without_calling() {
    let (config, seen) = recording_validator(ms(10), 100);
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));

    coordinator.update("bad".into(), true);
    sleep(ms(200)).await;
    assert_eq!(coordinator.error().as_deref(), Some("rejected bad"));

    coordinator.update("worse".into(), false);
    assert_eq!(coordinator.error(), None);

    sleep(ms(500)).await;
    assert_eq!(coordinator.error(), None);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn previous_error_stays_until_next_result() {
    let (config, _) = recording_validator(ms(10), 100);
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));

    coordinator.update("bad".into(), true);
    sleep(ms(200)).await;

    coordinator.update("ok".into(), true);
    sleep(ms(50)).await;
    assert_eq!(coordinator.error().as_deref(), Some("rejected bad"));

    sleep(ms(100)).await;
    assert_eq!(coordinator.error(), None);
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_in_flight_request() {
    let (config, seen) = recording_validator(ms(500), 100);
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));
    let mut rx = coordinator.subscribe();

    coordinator.update("bad".into(), true);
    sleep(ms(150)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);

    coordinator.teardown();
    rx.borrow_and_update();
    sleep(ms(2000)).await;

    assert!(!rx.has_changed().unwrap());
    assert_eq!(coordinator.error(), None);
    assert!(!coordinator.state().validating);
}

#[tokio::test(start_paused = true)]
async fn dropping_coordinator_cancels_timer() {
    let (config, seen) = recording_validator(ms(10), 300);
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));

    coordinator.update("bad".into(), true);
    drop(coordinator);
    sleep(ms(1000)).await;

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejection_uses_fallback_message() {
    let config = AsyncValidation::new(Arc::new(|_: FieldValue| async {
        Err::<Option<String>, _>(RemoteError::Failed("503 Service Unavailable".into()))
    }));
    let coordinator = AsyncValidationCoordinator::new("username", Some(&config));

    coordinator.update("alice".into(), true);
    sleep(ms(400)).await;

    assert_eq!(coordinator.error().as_deref(), Some(VALIDATION_FAILED_MESSAGE));
}

// ============================================================================
// Async Options
// ============================================================================

#[tokio::test(start_paused = true)]
async fn load_publishes_loading_then_options() {
    let (loader, calls) = counting_loader(countries(), ms(100));
    let coordinator = OptionsCoordinator::new("country", vec![], cache());

    coordinator.mount("countries", loader);
    let state = coordinator.state();
    assert!(state.loading);
    assert!(state.options.is_empty());
    assert_eq!(state.error, None);

    sleep(ms(150)).await;
    let state = coordinator.state();
    assert!(!state.loading);
    assert_eq!(state.options, countries());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cache_hit_skips_second_loader() {
    let cache = cache();
    let (first_loader, first_calls) = counting_loader(countries(), ms(100));
    let (second_loader, second_calls) =
        counting_loader(vec![SelectOption::new("Other", "x")], ms(100));

    let first = OptionsCoordinator::new("billingCountry", vec![], Arc::clone(&cache));
    first.mount("countries", first_loader);
    sleep(ms(150)).await;

    let second = OptionsCoordinator::new("shippingCountry", vec![], Arc::clone(&cache));
    second.mount("countries", second_loader);

    // Served synchronously from the cache
    let state = second.state();
    assert!(!state.loading);
    assert_eq!(state.options, countries());
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);

    sleep(ms(500)).await;
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn teardown_suppresses_pending_load() {
    let pending: Arc<dyn OptionsLoader> =
        Arc::new(|| futures::future::pending::<Result<Vec<SelectOption>, RemoteError>>());
    let coordinator = OptionsCoordinator::new("country", vec![], cache());
    let mut rx = coordinator.subscribe();

    coordinator.mount("countries", pending);
    assert!(coordinator.state().loading);
    coordinator.teardown();
    let before = rx.borrow_and_update().clone();
    assert!(!before.loading);

    sleep(ms(5000)).await;
    assert!(!rx.has_changed().unwrap());
    assert_eq!(coordinator.state(), before);
}

#[tokio::test(start_paused = true)]
async fn key_change_discards_previous_load() {
    let shared = cache();
    let (slow, _) = counting_loader(vec![SelectOption::new("Stale", "stale")], ms(500));
    let (fast, _) = counting_loader(countries(), ms(100));
    let coordinator = OptionsCoordinator::new("country", vec![], Arc::clone(&shared));

    coordinator.mount("old-key", slow);
    sleep(ms(50)).await;
    coordinator.mount("new-key", fast);
    assert_eq!(coordinator.key().as_deref(), Some("new-key"));

    sleep(ms(1000)).await;
    assert_eq!(coordinator.state().options, countries());
    // The cancelled load never reached the cache either
    assert!(!shared.contains("old-key"));
    assert!(shared.contains("new-key"));
}

#[tokio::test(start_paused = true)]
async fn load_failure_prefers_own_message() {
    let failing: Arc<dyn OptionsLoader> = Arc::new(|| async {
        Err::<Vec<SelectOption>, _>(RemoteError::Failed("Service unavailable".into()))
    });
    let coordinator = OptionsCoordinator::new("country", vec![], cache());

    coordinator.mount("countries", failing);
    sleep(ms(10)).await;

    let state = coordinator.state();
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Service unavailable"));
    assert!(state.options.is_empty());
}

#[tokio::test(start_paused = true)]
async fn opaque_failure_uses_fallback() {
    let failing: Arc<dyn OptionsLoader> =
        Arc::new(|| async { Err::<Vec<SelectOption>, _>(RemoteError::Opaque) });
    let shared = cache();
    let coordinator = OptionsCoordinator::new("country", vec![], Arc::clone(&shared));

    coordinator.mount("countries", failing);
    sleep(ms(10)).await;

    assert_eq!(coordinator.state().error.as_deref(), Some(LOAD_FAILED_MESSAGE));
    // Failures are not cached; a later mount retries
    assert!(shared.is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_entry_triggers_reload() {
    let shared = OptionsCache::new_shared(OptionsCacheConfig {
        capacity: 16,
        ttl: Some(Duration::from_secs(60)),
    });
    let (loader, calls) = counting_loader(countries(), ms(10));
    let coordinator = OptionsCoordinator::new("country", vec![], Arc::clone(&shared));

    coordinator.mount("countries", Arc::clone(&loader));
    sleep(ms(50)).await;
    coordinator.mount("countries", Arc::clone(&loader));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sleep(Duration::from_secs(61)).await;
    coordinator.mount("countries", loader);
    sleep(ms(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

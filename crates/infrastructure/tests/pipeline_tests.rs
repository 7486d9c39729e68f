//! End-to-end collector tests
//!
//! A wiremock provider feeds the real HTTP client, and readings land in the
//! in-memory broker through the real connection manager and publisher.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use application::{CycleOutcome, CycleStage};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use domain::value_objects::{ConnectionState, WeatherProvider};
use infrastructure::config::LocationConfig;
use infrastructure::{
    AppConfig, Clock, CollectorRuntime, RetryConfig, RuntimeError, SystemClock,
};
use integration_amqp::testing::InMemoryBroker;
use secrecy::SecretString;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE: &str = "weather_readings";

/// Clock stuck at one instant
#[derive(Debug)]
struct FrozenClock(DateTime<Utc>);

#[async_trait]
impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

fn open_meteo_body(temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "utc_offset_seconds": 0,
        "current_units": {"wind_speed_10m": "km/h"},
        "current": {
            "time": "2024-03-01T14:00",
            "temperature_2m": temperature,
            "relative_humidity_2m": 68,
            "wind_speed_10m": 11.2,
            "precipitation": 0.0,
            "weather_code": 2
        }
    })
}

async fn provider() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "52.52"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_meteo_body(4.2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-23.55"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_meteo_body(24.1)))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.broker.url = Some(SecretString::from("amqp://localhost:5672".to_string()));
    config.broker.reconnect.initial_delay_ms = 20;
    config.broker.reconnect.max_delay_ms = 100;
    config.broker.reconnect.jitter_factor = 0.0;
    config.provider.base_url = Some(format!("{}/v1/forecast", server.uri()));
    config.provider.timeout_secs = 2;
    config.provider.retry = RetryConfig::new(10, 50, 2.0, 2).without_jitter();
    config.locations = vec![
        LocationConfig {
            name: "Berlin".to_string(),
            latitude: 52.52,
            longitude: 13.405,
        },
        LocationConfig {
            name: "São Paulo".to_string(),
            latitude: -23.55,
            longitude: -46.63,
        },
    ];
    config
}

fn runtime(config: &AppConfig, broker: &InMemoryBroker) -> CollectorRuntime {
    CollectorRuntime::with_connector(config, Arc::new(broker.clone()), Arc::new(SystemClock))
        .expect("valid runtime")
}

async fn wait_for_messages(broker: &InMemoryBroker, count: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while broker.messages(QUEUE).len() < count {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("messages arrive in time");
}

#[tokio::test]
async fn one_cycle_per_location_lands_on_the_queue() {
    let server = provider().await;
    let broker = InMemoryBroker::new();
    let runtime = runtime(&config(&server), &broker);

    let outcomes = runtime.run_once().await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(CycleOutcome::is_published));

    let mut envelopes = broker.envelopes(QUEUE);
    assert_eq!(envelopes.len(), 2);
    envelopes.sort_by(|a, b| a.payload().location.name().cmp(b.payload().location.name()));

    let berlin = &envelopes[0];
    assert_eq!(berlin.schema_version(), 1);
    assert_eq!(berlin.delivery_attempt(), 1);
    assert_eq!(berlin.source(), WeatherProvider::OpenMeteo);
    assert_eq!(berlin.payload().temperature_c, Some(4.2));
    assert_eq!(berlin.payload().humidity_pct, Some(68));
    assert_eq!(berlin.payload().condition_text.as_deref(), Some("partly_cloudy"));
    assert_eq!(envelopes[1].payload().temperature_c, Some(24.1));

    assert!(broker.is_durable(QUEUE));
    assert!(broker.messages(QUEUE).iter().all(|m| m.persistent));

    let health = runtime.health();
    assert_eq!(health.connection, ConnectionState::Ready);
    assert!(health.is_ready(chrono::Duration::minutes(5)));
    assert_eq!(health.location("Berlin").map(|l| l.cycles_run), Some(1));
}

#[tokio::test]
async fn delivers_after_broker_rejects_first_connects() {
    let server = provider().await;
    let broker = InMemoryBroker::new();
    broker.reject_next_connects(2);
    let mut config = config(&server);
    config.locations.truncate(1);
    let runtime = runtime(&config, &broker);

    let outcomes = runtime.run_once().await;

    assert!(outcomes[0].is_published());
    assert_eq!(broker.connect_attempts(), 3);
    assert_eq!(broker.messages(QUEUE).len(), 1);
}

#[tokio::test]
async fn broker_outage_drops_reading_but_next_cycle_recovers() {
    let server = provider().await;
    let broker = InMemoryBroker::new();
    broker.reject_next_connects(u32::MAX);
    let mut config = config(&server);
    config.locations.truncate(1);
    config.broker.connect_budget_secs = 1;
    let runtime = runtime(&config, &broker);

    let outcomes = runtime.run_once().await;
    assert_eq!(
        outcomes,
        vec![CycleOutcome::Failed {
            stage: CycleStage::Publish
        }]
    );
    assert!(broker.messages(QUEUE).is_empty());
    let health = runtime.health();
    assert_eq!(health.connection, ConnectionState::Disconnected);
    assert_eq!(health.locations[0].cycles_failed, 1);
    assert!(health.locations[0].last_success_at.is_none());

    broker.reject_next_connects(0);
    let outcomes = runtime.run_once().await;
    assert!(outcomes[0].is_published());
    assert_eq!(broker.messages(QUEUE).len(), 1);
}

#[tokio::test]
async fn shutdown_during_broker_outage_cancels_the_cycle() {
    let server = provider().await;
    let broker = InMemoryBroker::new();
    broker.reject_next_connects(u32::MAX);
    let mut config = config(&server);
    config.locations.truncate(1);
    config.broker.connect_budget_secs = 0;
    let runtime = runtime(&config, &broker);
    let shutdown = runtime.shutdown_token();

    let (outcomes, ()) = tokio::join!(runtime.run_once(), async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
    });

    assert_eq!(outcomes, vec![CycleOutcome::Cancelled]);
    let health = runtime.health();
    assert_eq!(health.locations[0].cycles_run, 1);
    assert_eq!(health.locations[0].cycles_failed, 0);
    assert!(broker.messages(QUEUE).is_empty());
}

#[tokio::test]
async fn health_and_last_success_share_the_runtime_clock() {
    let server = provider().await;
    let broker = InMemoryBroker::new();
    let mut config = config(&server);
    config.locations.truncate(1);
    let at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let runtime = CollectorRuntime::with_connector(
        &config,
        Arc::new(broker.clone()),
        Arc::new(FrozenClock(at)),
    )
    .expect("valid runtime");

    assert!(runtime.run_once().await[0].is_published());

    let health = runtime.health();
    assert_eq!(health.locations[0].last_success_at, Some(at));
    assert_eq!(health.locations[0].seconds_since_last_success, Some(0));
    assert_eq!(broker.envelopes(QUEUE)[0].published_at(), at);
}

#[tokio::test]
async fn permanent_fetch_error_produces_no_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let broker = InMemoryBroker::new();
    let mut config = config(&server);
    config.locations.truncate(1);
    let runtime = runtime(&config, &broker);

    let outcomes = runtime.run_once().await;

    assert_eq!(
        outcomes,
        vec![CycleOutcome::Failed {
            stage: CycleStage::Fetch
        }]
    );
    assert_eq!(broker.connect_attempts(), 0);
}

#[tokio::test]
async fn runs_immediately_and_stops_promptly() {
    let server = provider().await;
    let broker = InMemoryBroker::new();
    let runtime = runtime(&config(&server), &broker);

    runtime.start().expect("starts");
    assert!(matches!(runtime.start(), Err(RuntimeError::AlreadyStarted)));

    // Default cadence is hourly-interval; only the immediate cycles run
    wait_for_messages(&broker, 2).await;

    tokio::time::timeout(Duration::from_secs(5), runtime.stop())
        .await
        .expect("stop does not wait out the interval");

    assert_eq!(broker.messages(QUEUE).len(), 2);
    assert_eq!(runtime.health().connection, ConnectionState::Disconnected);
    assert!(matches!(runtime.start(), Err(RuntimeError::Stopped)));
}

#[tokio::test]
async fn without_immediate_run_nothing_is_collected_before_first_tick() {
    let server = provider().await;
    let broker = InMemoryBroker::new();
    let mut config = config(&server);
    config.schedule.run_immediately = false;
    let runtime = runtime(&config, &broker);

    runtime.start().expect("starts");
    tokio::time::sleep(Duration::from_millis(300)).await;
    runtime.stop().await;

    assert!(broker.messages(QUEUE).is_empty());
    assert_eq!(broker.connect_attempts(), 0);
}

#[test]
fn invalid_config_is_rejected() {
    let broker = InMemoryBroker::new();
    let config = AppConfig::default();
    let err = CollectorRuntime::with_connector(&config, Arc::new(broker), Arc::new(SystemClock))
        .expect_err("no broker url and no locations");
    assert!(matches!(err, RuntimeError::Config(_)));
}

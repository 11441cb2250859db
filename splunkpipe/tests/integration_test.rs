use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use mockito::{Matcher, Server};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use splunkpipe::config::{ChannelIdMode, HecConfig, TokenPlacement};
use splunkpipe::downstream::{HecEventTransport, HecRawTransport};
use splunkpipe::pipeline::{ClockSource, KpiPipeline, SleepFuture};
use splunkpipe::shipper::Shipper;
use splunkpipe::types::{HecEvent, TelemetryRecord};

#[tokio::test]
async fn raw_collector_receives_newline_joined_batches() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/raw")
        .match_header("authorization", "Splunk tok-1")
        .match_body("a\nb\nc")
        .with_status(200)
        .create_async()
        .await;

    let mut config = HecConfig::new(server.url(), "tok-1");
    config.batch_size = 3;
    config.batch_interval = Duration::ZERO;

    let transport = HecRawTransport::new(&config).expect("valid collector config");
    let shipper = Shipper::start(transport, &config);
    shipper.add("a");
    shipper.add("b");
    shipper.add("c");
    shipper.shutdown(Duration::from_secs(5)).await;

    mock.assert_async().await;
}

#[tokio::test]
async fn query_string_auth_and_channel_ride_the_url() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/raw")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("token".into(), "tok-1".into()),
            Matcher::Regex("channel=[0-9a-f-]{36}".into()),
        ]))
        .with_status(200)
        .create_async()
        .await;

    let mut config = HecConfig::new(server.url(), "tok-1");
    config.token_placement = TokenPlacement::QueryString;
    config.channel_id = ChannelIdMode::QueryString;
    config.batch_interval = Duration::ZERO;

    let transport = HecRawTransport::new(&config).expect("valid collector config");
    let shipper = Shipper::start(transport, &config);
    shipper.add("one line");
    shipper.shutdown(Duration::from_secs(5)).await;

    mock.assert_async().await;
}

#[tokio::test]
async fn event_collector_receives_concatenated_envelopes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/event")
        .match_header("content-type", "application/json")
        .match_body(r#"{"event":"one"} {"event":"two","host":"web01"}"#)
        .with_status(200)
        .create_async()
        .await;

    let mut config = HecConfig::new(server.url(), "tok-1");
    config.batch_interval = Duration::ZERO;

    let transport = HecEventTransport::new(&config).expect("valid collector config");
    let shipper = Shipper::start(transport, &config);
    shipper.add(HecEvent::new("one"));
    let mut second = HecEvent::new("two");
    second.host = "web01".to_owned();
    shipper.add(second);
    shipper.shutdown(Duration::from_secs(5)).await;

    mock.assert_async().await;
}

#[tokio::test]
async fn a_rejected_batch_does_not_stop_the_next_one() {
    let mut server = Server::new_async().await;
    let unauthorized = server
        .mock("POST", "/raw")
        .match_body("first")
        .with_status(401)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/raw")
        .match_body("second")
        .with_status(200)
        .create_async()
        .await;

    let mut config = HecConfig::new(server.url(), "tok-1");
    config.batch_size = 1;
    config.batch_interval = Duration::ZERO;

    let transport = HecRawTransport::new(&config).expect("valid collector config");
    let shipper = Shipper::start(transport, &config);
    shipper.add("first");
    shipper.add("second");
    shipper.shutdown(Duration::from_secs(5)).await;

    unauthorized.assert_async().await;
    accepted.assert_async().await;
}

/// A wall clock that only moves when the test permits a timer cycle, so
/// window flushes happen exactly when the test says so.
fn gated_minute_source(gate: Arc<Semaphore>) -> ClockSource {
    let now_millis = Arc::new(AtomicU64::new(0));
    let sleep_millis = now_millis.clone();
    ClockSource::Dynamic {
        now: Box::new(move || {
            UNIX_EPOCH + Duration::from_millis(now_millis.load(Ordering::SeqCst))
        }),
        sleep: Box::new(move |requested: Duration| -> SleepFuture {
            let gate = gate.clone();
            let clock = sleep_millis.clone();
            Box::pin(async move {
                let permit = gate.acquire().await.expect("gate stays open");
                permit.forget();
                clock.fetch_add(requested.as_millis() as u64, Ordering::SeqCst);
            })
        }),
    }
}

#[tokio::test]
async fn kpi_windows_flush_into_the_delivery_path() {
    let gate = Arc::new(Semaphore::new(0));
    let (sender, mut shipped) = tokio::sync::mpsc::unbounded_channel();

    let kpis = KpiPipeline::start(
        "checkout",
        gated_minute_source(gate.clone()),
        move |record| {
            let _ = sender.send(TelemetryRecord::Text(record.to_string()));
        },
    );

    kpis.register("latency", 5.0, "acme", [("region", "east")]);
    kpis.register("latency", 7.0, "acme", [("region", "east")]);

    // Let the minute roll over once.
    gate.add_permits(1);
    let record = timeout(Duration::from_secs(5), shipped.recv())
        .await
        .expect("window should flush")
        .expect("sender alive");
    assert_eq!(
        TelemetryRecord::Text(
            "kpi=\"latency\" application=\"checkout\" account=acme count=2 sum=12 min=5 max=7 region=\"east\""
                .to_owned()
        ),
        record
    );

    // An empty window emits nothing.
    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(shipped.try_recv().is_err());

    kpis.shutdown().await;
}

// Probe and scan tests against an emulated Tasmota web server.

use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tasmota_finder_core::scanner::{self, ProgressCallback};
use tasmota_finder_core::{
    DeviceRecord, FixedPrefix, NetworkPrefix, PartialPolicy, Prober, ScanStage, report,
};

const LOCALHOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

const STATUS_BODY: &str =
    r#"{"Status":{"Module":1,"DeviceName":"Plug1","FriendlyName":["Kitchen Plug"],"Topic":["tasmota_50"]}}"#;

const STATUS_NET_BODY: &str =
    r#"{"StatusNET":{"Hostname":"tasmota-50","IPAddress":"127.0.0.1","Mac":"AA:BB:CC:DD:EE:FF"}}"#;

// ── Helpers ─────────────────────────────────────────────────────────

async fn mount_command(server: &MockServer, cmnd: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/cm"))
        .and(query_param("cmnd", cmnd))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn tasmota_server() -> MockServer {
    let server = MockServer::start().await;
    mount_command(&server, "STATUS", STATUS_BODY).await;
    mount_command(&server, "STATUS 5", STATUS_NET_BODY).await;
    server
}

fn prober_for(server: &MockServer, partial: PartialPolicy) -> Prober {
    Prober::new(Duration::from_secs(2), server.address().port(), partial).unwrap()
}

fn expected_device() -> DeviceRecord {
    DeviceRecord {
        ip: LOCALHOST,
        mac: "AA:BB:CC:DD:EE:FF".to_string(),
        hostname: "tasmota-50".to_string(),
        device_name: "Plug1".to_string(),
        friendly_name: "Kitchen Plug".to_string(),
        topic: vec!["tasmota_50".to_string()],
    }
}

// ── Single host probes ──────────────────────────────────────────────

#[tokio::test]
async fn test_probe_full_record() {
    let server = tasmota_server().await;
    let prober = prober_for(&server, PartialPolicy::Keep);

    let device = prober.probe(LOCALHOST).await;

    assert_eq!(device, Some(expected_device()));
}

#[tokio::test]
async fn test_probe_unexpected_shape_is_not_a_device() {
    let server = MockServer::start().await;
    mount_command(&server, "STATUS", r#"{"unexpected":"shape"}"#).await;

    // The second command must never be sent for a non-matching host.
    Mock::given(method("GET"))
        .and(query_param("cmnd", "STATUS 5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_NET_BODY))
        .expect(0)
        .mount(&server)
        .await;

    let prober = prober_for(&server, PartialPolicy::Keep);
    assert_eq!(prober.probe(LOCALHOST).await, None);
}

#[tokio::test]
async fn test_probe_marker_with_broken_json() {
    let server = MockServer::start().await;
    mount_command(&server, "STATUS", r#"{"Status":{"Module":1,"DeviceName":"Plu"#).await;

    let prober = prober_for(&server, PartialPolicy::Keep);
    assert_eq!(prober.probe(LOCALHOST).await, None);
}

#[tokio::test]
async fn test_probe_missing_names_default_to_unknown() {
    let server = MockServer::start().await;
    mount_command(&server, "STATUS", r#"{"Status":{"Module":0,"FriendlyName":[]}}"#).await;
    mount_command(&server, "STATUS 5", STATUS_NET_BODY).await;

    let prober = prober_for(&server, PartialPolicy::Keep);
    let device = prober.probe(LOCALHOST).await.unwrap();

    assert_eq!(device.device_name, "Unknown");
    assert_eq!(device.friendly_name, "Unknown");
    assert_eq!(device.topic, vec!["Unknown"]);
    assert_eq!(device.mac, "AA:BB:CC:DD:EE:FF");
}

#[tokio::test]
async fn test_probe_partial_record_kept() {
    let server = MockServer::start().await;
    mount_command(&server, "STATUS", STATUS_BODY).await;
    mount_command(&server, "STATUS 5", r#"{"WARNING":"Need user=<username>&password=<password>"}"#).await;

    let prober = prober_for(&server, PartialPolicy::Keep);
    let device = prober.probe(LOCALHOST).await.unwrap();

    assert_eq!(device.device_name, "Plug1");
    assert_eq!(device.mac, "Unknown");
    assert_eq!(device.hostname, "Unknown");
}

#[tokio::test]
async fn test_probe_partial_record_dropped() {
    let server = MockServer::start().await;
    mount_command(&server, "STATUS", STATUS_BODY).await;
    // No STATUS 5 mock: wiremock answers 404 with an empty body.

    let prober = prober_for(&server, PartialPolicy::Drop);
    assert_eq!(prober.probe(LOCALHOST).await, None);
}

#[tokio::test]
async fn test_probe_timeout_is_not_a_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cm"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(STATUS_BODY)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let prober = Prober::new(
        Duration::from_millis(200),
        server.address().port(),
        PartialPolicy::Keep,
    )
    .unwrap();

    assert_eq!(prober.probe(LOCALHOST).await, None);
}

#[tokio::test]
async fn test_probe_connection_refused() {
    let port = {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap().port()
    };

    let prober = Prober::new(Duration::from_secs(1), port, PartialPolicy::Keep).unwrap();
    assert_eq!(prober.probe(LOCALHOST).await, None);
}

#[tokio::test]
async fn test_custom_client_is_used_for_both_commands() {
    let server = MockServer::start().await;
    for (cmnd, body) in [("STATUS", STATUS_BODY), ("STATUS 5", STATUS_NET_BODY)] {
        Mock::given(method("GET"))
            .and(path("/cm"))
            .and(query_param("cmnd", cmnd))
            .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        reqwest::header::HeaderValue::from_static("Basic YWRtaW46c2VjcmV0"),
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .no_proxy()
        .build()
        .unwrap();

    let prober = Prober::with_client(client, server.address().port(), PartialPolicy::Drop);
    assert_eq!(prober.probe(LOCALHOST).await, Some(expected_device()));
}

// ── Whole subnet scans ──────────────────────────────────────────────
//
// Every 127.0.0.x address is routed to loopback on Linux, while the mock
// server only listens on 127.0.0.1, so the other 254 candidates are refused.

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_scan_finds_single_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cm"))
        .and(query_param("cmnd", "STATUS"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STATUS_BODY))
        .expect(1)
        .mount(&server)
        .await;
    mount_command(&server, "STATUS 5", STATUS_NET_BODY).await;

    let prober = prober_for(&server, PartialPolicy::Keep);
    let result = scanner::scan_prefix(NetworkPrefix::new(127, 0, 0), &prober, None).await;

    assert_eq!(result.devices, vec![expected_device()]);
    assert_eq!(result.prefix.to_string(), "127.0.0");
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_scan_reports_progress_for_every_candidate() {
    let server = tasmota_server().await;
    let prober = prober_for(&server, PartialPolicy::Keep);

    let probing = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let callback: ProgressCallback = {
        let probing = probing.clone();
        let completed = completed.clone();
        Box::new(move |progress| match progress.stage {
            ScanStage::Probing => {
                probing.fetch_add(1, Ordering::SeqCst);
            }
            ScanStage::Complete => {
                assert_eq!(progress.probed, 255);
                assert_eq!(progress.devices_found, 1);
                completed.fetch_add(1, Ordering::SeqCst);
            }
            ScanStage::DetectingNetwork => {}
        })
    };

    let source = FixedPrefix(NetworkPrefix::new(127, 0, 0));
    let result = scanner::scan_network(&source, &prober, Some(callback))
        .await
        .unwrap();

    assert_eq!(result.devices.len(), 1);
    assert_eq!(probing.load(Ordering::SeqCst), 255);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_scan_is_repeatable() {
    let server = tasmota_server().await;
    let prober = prober_for(&server, PartialPolicy::Keep);
    let prefix = NetworkPrefix::new(127, 0, 0);

    let first: HashSet<_> = scanner::scan_prefix(prefix, &prober, None)
        .await
        .devices
        .into_iter()
        .map(|d| d.ip)
        .collect();
    let second: HashSet<_> = scanner::scan_prefix(prefix, &prober, None)
        .await
        .devices
        .into_iter()
        .map(|d| d.ip)
        .collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_scan_then_write_json_report() {
    let server = tasmota_server().await;
    let prober = prober_for(&server, PartialPolicy::Keep);
    let result = scanner::scan_prefix(NetworkPrefix::new(127, 0, 0), &prober, None).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.json");
    report::write_json_report(&path, &result.devices).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let map = written.as_object().unwrap();

    assert_eq!(map.len(), 1);
    assert_eq!(map["AA:BB:CC:DD:EE:FF"]["Ip"], "127.0.0.1");
    assert_eq!(map["AA:BB:CC:DD:EE:FF"]["FriendlyName"], "Kitchen Plug");
}

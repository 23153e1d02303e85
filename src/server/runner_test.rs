//! End-to-end tests for the dual-listener lifecycle
//!
//! Both listeners are bound on ephemeral ports and the random service is a
//! wiremock server.

use super::context::ServiceContext;
use super::lifecycle::ServiceState;
use super::metrics::create_metrics;
use super::runner::*;
use crate::config::Config;
use crate::random::HttpRandomClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct RunningService {
    ctx: Arc<ServiceContext>,
    public: SocketAddr,
    admin: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), RunError>>,
}

fn context(base_url: String, shutdown_timeout: Duration) -> Arc<ServiceContext> {
    let config = Config {
        port: 0,
        admin_port: 0,
        shutdown_timeout,
        random_service_base_url: base_url.clone(),
    };
    Arc::new(ServiceContext::new(
        config,
        Arc::new(HttpRandomClient::new(base_url)),
        create_metrics().unwrap(),
    ))
}

async fn start(ctx: Arc<ServiceContext>) -> RunningService {
    let public = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let public_addr = public.local_addr().unwrap();
    let admin_addr = admin.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let serve_ctx = ctx.clone();
    let handle = tokio::spawn(async move {
        serve(serve_ctx, public, Some(admin), async move {
            let _ = stopped.await;
        })
        .await
    });

    let service = RunningService {
        ctx,
        public: public_addr,
        admin: admin_addr,
        stop,
        handle,
    };
    wait_until_running(&service).await;
    service
}

async fn wait_until_running(service: &RunningService) {
    for _ in 0..100 {
        if service.ctx.lifecycle.current_state() == ServiceState::Running {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("service never reached Running");
}

async fn random_service(values: &str, delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/random/next"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(values.to_string())
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_serves_color_and_shuts_down_cleanly() {
    let downstream = random_service(r#"{"values":[255,0,50]}"#, Duration::ZERO).await;
    let ctx = context(
        format!("{}/random", downstream.uri()),
        Duration::from_secs(30),
    );
    let service = start(ctx).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/next", service.public))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        r##"{"hex":"#ff0032","r":255,"g":0,"b":50}"##
    );

    let ready = client
        .get(format!("http://{}/ready", service.admin))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 200);

    let started = Instant::now();
    service.stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), service.handle)
        .await
        .expect("shutdown should finish well before the timeout")
        .unwrap();

    assert!(result.is_ok(), "clean shutdown expected, got {:?}", result);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        service.ctx.lifecycle.current_state(),
        ServiceState::ShuttingDown
    );
}

#[tokio::test]
async fn test_unreachable_random_service_is_bad_request() {
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = unused.local_addr().unwrap().port();
    drop(unused);

    let ctx = context(format!("http://127.0.0.1:{}", port), Duration::from_secs(5));
    let service = start(ctx).await;

    let response = reqwest::get(format!("http://{}/next", service.public))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let json: serde_json::Value = response.json().await.unwrap();
    let message = json["error"].as_str().unwrap().to_lowercase();
    assert!(message.contains("connect"), "got: {}", message);

    service.stop.send(()).unwrap();
    assert!(service.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_undecodable_random_response_is_bad_request() {
    let downstream = random_service("not json", Duration::ZERO).await;
    let ctx = context(
        format!("{}/random", downstream.uri()),
        Duration::from_secs(5),
    );
    let service = start(ctx).await;

    let response = reqwest::get(format!("http://{}/next", service.public))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let json: serde_json::Value = response.json().await.unwrap();
    assert!(
        !json["error"].as_str().unwrap().is_empty(),
        "error message expected, got {}",
        json
    );

    service.stop.send(()).unwrap();
    assert!(service.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_readiness_fails_while_draining_in_flight_request() {
    let downstream = random_service(r#"{"values":[1,2,3]}"#, Duration::from_millis(600)).await;
    let ctx = context(
        format!("{}/random", downstream.uri()),
        Duration::from_secs(10),
    );
    let service = start(ctx).await;

    let public = service.public;
    let in_flight = tokio::spawn(async move {
        reqwest::Client::new()
            .get(format!("http://{}/next", public))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(150)).await;

    service.stop.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let ready = reqwest::get(format!("http://{}/ready", service.admin))
        .await
        .unwrap();
    assert_eq!(ready.status(), 503);
    assert!(ready.text().await.unwrap().contains("shutting down"));

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), 200, "in-flight request must complete");

    let result = service.handle.await.unwrap();
    assert!(result.is_ok(), "drain should finish in time, got {:?}", result);
}

#[tokio::test]
async fn test_shutdown_timeout_is_an_error() {
    let downstream = random_service(r#"{"values":[1,2,3]}"#, Duration::from_secs(5)).await;
    let ctx = context(
        format!("{}/random", downstream.uri()),
        Duration::from_millis(200),
    );
    let service = start(ctx).await;

    let public = service.public;
    let _in_flight = tokio::spawn(async move {
        reqwest::Client::new()
            .get(format!("http://{}/next", public))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(150)).await;

    let started = Instant::now();
    service.stop.send(()).unwrap();
    let result = service.handle.await.unwrap();

    assert!(
        matches!(result, Err(RunError::ShutdownTimeout(t)) if t == Duration::from_millis(200)),
        "got {:?}",
        result
    );
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_public_bind_failure_is_fatal() {
    let occupied = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut ctx = context("http://localhost/random".to_string(), Duration::from_secs(1));
    let config = &mut Arc::get_mut(&mut ctx).unwrap().config;
    config.port = port;
    config.admin_port = port;

    let result = run(ctx.clone(), std::future::pending()).await;

    assert!(
        matches!(result, Err(RunError::PublicBind { .. })),
        "got {:?}",
        result
    );
    assert_eq!(ctx.lifecycle.current_state(), ServiceState::Starting);
}

#[tokio::test]
async fn test_admin_bind_failure_is_not_fatal() {
    let occupied = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let admin_port = occupied.local_addr().unwrap().port();

    let mut ctx = context("http://localhost/random".to_string(), Duration::from_secs(1));
    Arc::get_mut(&mut ctx).unwrap().config.admin_port = admin_port;

    let result = run(ctx.clone(), tokio::time::sleep(Duration::from_millis(100))).await;

    assert!(result.is_ok(), "got {:?}", result);
    assert_eq!(ctx.lifecycle.current_state(), ServiceState::ShuttingDown);
}

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use spinmouse::{
    commands::{CameraCommand, UiEvent},
    display::{display_channel, show_frame},
    web::{AppState, Phase, SharedStatus, UiStatus, router},
};
use spinmouse_ci::{Mono8Frame, TriggerMode};

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn setup_and_acquisition_requests() {
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let (display_tx, display_rx) = display_channel();
    let status = SharedStatus::new(UiStatus::new("SIM0001", "20240131_01_"));
    let app = router(AppState::new(status.clone(), display_rx, events_tx));

    // index page
    let resp = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("frame.jpg"));

    // status before any image
    let resp = app
        .clone()
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["phase"], "setup");
    assert_eq!(json["default_experiment_id"], "20240131_01_");
    assert_eq!(json["has_image"], false);
    assert_eq!(json["counters"]["acquired"], 0);

    let resp = app
        .clone()
        .oneshot(Request::get("/frame.jpg").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    show_frame(&display_tx, Mono8Frame::new(16, 8, vec![128; 16 * 8]).unwrap());
    let resp = app
        .clone()
        .oneshot(Request::get("/frame.jpg").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(&body_bytes(resp).await[..2], &[0xFF, 0xD8]);

    // setup phase requests
    let resp = app
        .clone()
        .oneshot(post_json("/offset", r#"{"x": 12.5, "y": 4}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(events_rx.try_recv().unwrap(), UiEvent::Click { x: 12.5, y: 4.0 });

    let resp = app.clone().oneshot(post_empty("/begin")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(events_rx.try_recv().unwrap(), UiEvent::Begin(None));

    let resp = app
        .clone()
        .oneshot(post_json("/begin", r#"{"experiment_id": "mouse1"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(
        events_rx.try_recv().unwrap(),
        UiEvent::Begin(Some("mouse1".into()))
    );

    let resp = app.clone().oneshot(post_empty("/stop")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(events_rx.try_recv().is_err());

    // acquisition phase requests
    status.modify(|s| s.phase = Phase::Acquisition);
    let resp = app
        .clone()
        .oneshot(post_json("/trigger-mode", r#"{"enabled": false}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(
        events_rx.try_recv().unwrap(),
        UiEvent::Camera(CameraCommand::SetTriggerMode(TriggerMode::Off))
    );

    let resp = app.clone().oneshot(post_empty("/cancel")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app.clone().oneshot(post_empty("/stop")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(events_rx.try_recv().unwrap(), UiEvent::Stop);
}

#[tokio::test]
async fn requests_after_session_end_are_unavailable() {
    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let (_display_tx, display_rx) = display_channel();
    let status = SharedStatus::new(UiStatus::new("SIM0001", "x"));
    let app = router(AppState::new(status, display_rx, events_tx));
    drop(events_rx);

    let resp = app.oneshot(post_empty("/cancel")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

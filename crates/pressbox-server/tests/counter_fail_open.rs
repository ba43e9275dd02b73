// SPDX-License-Identifier: Apache-2.0

//! Counting is best-effort: an unreachable counter store must never block
//! content delivery or fail the view-recording endpoint.

mod support;

use std::sync::atomic::Ordering;
use support::{seed_active_editor, send_request, spawn_app};

#[tokio::test]
async fn view_recording_fails_open_when_the_counter_store_is_down() {
    let app = spawn_app().await;
    let cookie = seed_active_editor(&app).await;

    let (status, _, _) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &cookie)],
        Some(r#"{"slug":"resilient","title":"Resilient","body":"<p>b</p>","status":"published"}"#),
    )
    .await;
    assert_eq!(status, 201);

    app.counter.fail_all.store(true, Ordering::Relaxed);

    // The endpoint still answers success-shaped.
    let (status, _, body) = send_request(
        app.addr,
        "POST",
        "/v1/posts/resilient/view",
        &[],
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    // The page stays servable and the total is simply unaffected.
    let (status, _, body) =
        send_request(app.addr, "GET", "/v1/posts/resilient", &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(body["post"]["views"]["cumulative"], 0);

    // The drop is visible in metrics.
    let (_, _, metrics) = send_request(app.addr, "GET", "/metrics", &[], None).await;
    let text = metrics.as_str().expect("metrics text");
    let fail_open_line = text
        .lines()
        .find(|l| l.starts_with("pressbox_view_counter_fail_open_total"))
        .expect("fail-open metric");
    let count: u64 = fail_open_line
        .split_whitespace()
        .last()
        .and_then(|v| v.parse().ok())
        .expect("metric value");
    assert!(count >= 1);

    // Recovery: counting resumes without a restart.
    app.counter.fail_all.store(false, Ordering::Relaxed);
    let (status, _, _) = send_request(
        app.addr,
        "POST",
        "/v1/posts/resilient/view",
        &[],
        None,
    )
    .await;
    assert_eq!(status, 200);
    let (_, _, body) = send_request(app.addr, "GET", "/v1/posts/resilient", &[], None).await;
    assert_eq!(body["post"]["views"]["cumulative"], 1);
}

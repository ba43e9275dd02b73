// SPDX-License-Identifier: Apache-2.0

//! End-to-end contract over the public surface: create → view → publish →
//! trash → restore, with view accounting intact throughout.

mod support;

use support::{seed_active_admin, seed_active_editor, send_request, spawn_app};

#[tokio::test]
async fn full_post_lifecycle_keeps_views_and_status() {
    let app = spawn_app().await;
    let editor_cookie = seed_active_editor(&app).await;
    let admin_cookie = seed_active_admin(&app).await;

    // Create a draft with an explicit slug and empty view ledger.
    let (status, _, body) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &editor_cookie)],
        Some(
            r#"{"slug":"rental-fraud-101","title":"Rental Fraud 101","body":"<p>spotting it</p>","status":"draft"}"#,
        ),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["post"]["slug"], "rental-fraud-101");
    assert_eq!(body["post"]["views"]["cumulative"], 0);

    // Three same-day views.
    for _ in 0..3 {
        let (status, _, body) = send_request(
            app.addr,
            "POST",
            "/v1/posts/rental-fraud-101/view",
            &[],
            None,
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
    }

    // The author sees the merged total: durable 0 + today's delta 3.
    let (status, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts/rental-fraud-101",
        &[("cookie", &editor_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["post"]["views"]["cumulative"], 3);

    // Anonymous readers cannot see the draft.
    let (status, _, _) =
        send_request(app.addr, "GET", "/v1/posts/rental-fraud-101", &[], None).await;
    assert_eq!(status, 404);

    // Publish, then the post resolves publicly.
    let (status, _, body) = send_request(
        app.addr,
        "PATCH",
        "/v1/posts/rental-fraud-101?action=publish",
        &[("cookie", &editor_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["post"]["status"], "published");

    let (status, _, _) =
        send_request(app.addr, "GET", "/v1/posts/rental-fraud-101", &[], None).await;
    assert_eq!(status, 200);

    // Trash hides it publicly but the admin listing still shows it.
    let (status, _, _) = send_request(
        app.addr,
        "DELETE",
        "/v1/posts/rental-fraud-101",
        &[("cookie", &editor_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);

    let (status, _, _) =
        send_request(app.addr, "GET", "/v1/posts/rental-fraud-101", &[], None).await;
    assert_eq!(status, 404);

    let (status, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts?deleted=true",
        &[("cookie", &admin_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["posts"][0]["slug"], "rental-fraud-101");
    assert_eq!(body["posts"][0]["deleted"], true);

    // Restore returns the post to Published with its views intact.
    let (status, _, body) = send_request(
        app.addr,
        "PATCH",
        "/v1/posts/rental-fraud-101?action=restore",
        &[("cookie", &admin_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["post"]["status"], "published");
    assert_eq!(body["post"]["deleted"], false);

    let (status, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts/rental-fraud-101",
        &[],
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["post"]["views"]["cumulative"], 3);

    // After an explicit merge the durable ledger carries the three views
    // and the total is unchanged (no double count).
    app.state.views.flush_all().await;
    let (status, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts/rental-fraud-101",
        &[],
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["post"]["views"]["cumulative"], 3);
    let by_date = body["post"]["views"]["by_date"]
        .as_object()
        .expect("by_date map");
    let folded: u64 = by_date.values().map(|v| v.as_u64().unwrap_or(0)).sum();
    assert_eq!(folded, 3);
}

#[tokio::test]
async fn public_listing_hides_drafts_and_trash() {
    let app = spawn_app().await;
    let editor_cookie = seed_active_editor(&app).await;

    for (slug, status) in [("live-one", "published"), ("draft-one", "draft")] {
        let payload = format!(
            r#"{{"slug":"{slug}","title":"T {slug}","body":"<p>b</p>","status":"{status}"}}"#
        );
        let (status, _, _) = send_request(
            app.addr,
            "POST",
            "/v1/posts",
            &[("cookie", &editor_cookie)],
            Some(&payload),
        )
        .await;
        assert_eq!(status, 201);
    }

    let (status, _, body) = send_request(app.addr, "GET", "/v1/posts", &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["posts"][0]["slug"], "live-one");
}

#[tokio::test]
async fn check_slug_reports_reserved_slugs_including_trashed() {
    let app = spawn_app().await;
    let editor_cookie = seed_active_editor(&app).await;

    let (_, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts/check-slug?slug=fresh-slug",
        &[],
        None,
    )
    .await;
    assert_eq!(body["available"], true);

    let (status, _, _) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &editor_cookie)],
        Some(r#"{"slug":"fresh-slug","title":"Taken","body":"<p>b</p>","status":"published"}"#),
    )
    .await;
    assert_eq!(status, 201);

    let (_, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts/check-slug?slug=fresh-slug",
        &[],
        None,
    )
    .await;
    assert_eq!(body["available"], false);

    // Trashing keeps the slug reserved; only purge would release it.
    let (status, _, _) = send_request(
        app.addr,
        "DELETE",
        "/v1/posts/fresh-slug",
        &[("cookie", &editor_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);
    let (_, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts/check-slug?slug=fresh-slug",
        &[],
        None,
    )
    .await;
    assert_eq!(body["available"], false);
}

#[tokio::test]
async fn request_id_is_propagated_and_metrics_render() {
    let app = spawn_app().await;
    let (_, head, _) = send_request(
        app.addr,
        "GET",
        "/healthz",
        &[("x-request-id", "req-fixture-1")],
        None,
    )
    .await;
    assert_eq!(
        support::header_value(&head, "x-request-id"),
        Some("req-fixture-1")
    );

    let (status, _, body) = send_request(app.addr, "GET", "/metrics", &[], None).await;
    assert_eq!(status, 200);
    let text = body.as_str().expect("metrics text");
    assert!(text.contains("pressbox_requests_total"));
    assert!(text.contains("pressbox_view_counter_fail_open_total"));
}

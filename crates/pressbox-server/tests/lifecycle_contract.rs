// SPDX-License-Identifier: Apache-2.0

//! Lifecycle guard rails over HTTP: duplicate slugs, illegal transitions,
//! validation on publish, and purge semantics.

mod support;

use support::{seed_active_admin, seed_active_editor, send_request, spawn_app};

#[tokio::test]
async fn duplicate_slug_creation_conflicts() {
    let app = spawn_app().await;
    let cookie = seed_active_editor(&app).await;
    let payload =
        r#"{"slug":"one-and-only","title":"First","body":"<p>b</p>","status":"published"}"#;

    let (status, _, _) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &cookie)],
        Some(payload),
    )
    .await;
    assert_eq!(status, 201);

    let (status, _, body) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &cookie)],
        Some(payload),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "duplicate_slug");
    assert_eq!(body["error"]["details"]["slug"], "one-and-only");
}

#[tokio::test]
async fn purge_is_unreachable_from_a_live_post() {
    let app = spawn_app().await;
    let editor_cookie = seed_active_editor(&app).await;
    let admin_cookie = seed_active_admin(&app).await;

    let (status, _, _) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &editor_cookie)],
        Some(r#"{"slug":"keep-me","title":"Keep","body":"<p>b</p>","status":"published"}"#),
    )
    .await;
    assert_eq!(status, 201);

    let (status, _, body) = send_request(
        app.addr,
        "DELETE",
        "/v1/posts/keep-me?action=destroy",
        &[("cookie", &admin_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "invalid_transition");

    // Trash first, then the same purge goes through, and the slug is gone
    // for good: restore finds nothing.
    let (status, _, _) = send_request(
        app.addr,
        "DELETE",
        "/v1/posts/keep-me",
        &[("cookie", &admin_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);
    let (status, _, _) = send_request(
        app.addr,
        "DELETE",
        "/v1/posts/keep-me?action=destroy",
        &[("cookie", &admin_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 200);
    let (status, _, body) = send_request(
        app.addr,
        "PATCH",
        "/v1/posts/keep-me?action=restore",
        &[("cookie", &admin_cookie)],
        None,
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "not_found");

    // Purge released the slug for reuse.
    let (_, _, body) = send_request(
        app.addr,
        "GET",
        "/v1/posts/check-slug?slug=keep-me",
        &[],
        None,
    )
    .await;
    assert_eq!(body["available"], true);
}

#[tokio::test]
async fn publish_with_empty_body_is_rejected() {
    let app = spawn_app().await;
    let cookie = seed_active_editor(&app).await;

    let (status, _, _) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &cookie)],
        Some(r#"{"slug":"empty-draft","title":"Empty","status":"draft"}"#),
    )
    .await;
    assert_eq!(status, 201);

    let (status, _, body) = send_request(
        app.addr,
        "PATCH",
        "/v1/posts/empty-draft?action=publish",
        &[("cookie", &cookie)],
        None,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "validation_failed");

    // Creating as published with no body fails the same way.
    let (status, _, body) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &cookie)],
        Some(r#"{"slug":"born-empty","title":"Empty","status":"published"}"#),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "validation_failed");
}

#[tokio::test]
async fn trash_is_idempotent_over_http() {
    let app = spawn_app().await;
    let cookie = seed_active_editor(&app).await;

    let (status, _, _) = send_request(
        app.addr,
        "POST",
        "/v1/posts",
        &[("cookie", &cookie)],
        Some(r#"{"slug":"bin-me","title":"Bin","body":"<p>b</p>","status":"published"}"#),
    )
    .await;
    assert_eq!(status, 201);

    for _ in 0..2 {
        let (status, _, body) = send_request(
            app.addr,
            "DELETE",
            "/v1/posts/bin-me",
            &[("cookie", &cookie)],
            None,
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
    }
}

#[tokio::test]
async fn rename_to_a_taken_slug_conflicts() {
    let app = spawn_app().await;
    let cookie = seed_active_editor(&app).await;

    for slug in ["first-post", "second-post"] {
        let payload = format!(
            r#"{{"slug":"{slug}","title":"T","body":"<p>b</p>","status":"published"}}"#
        );
        let (status, _, _) = send_request(
            app.addr,
            "POST",
            "/v1/posts",
            &[("cookie", &cookie)],
            Some(&payload),
        )
        .await;
        assert_eq!(status, 201);
    }

    let (status, _, body) = send_request(
        app.addr,
        "PUT",
        "/v1/posts/second-post",
        &[("cookie", &cookie)],
        Some(r#"{"slug":"first-post","title":"T","body":"<p>b</p>"}"#),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "duplicate_slug");

    // A rename to a free slug works and the old slug stops resolving.
    let (status, _, _) = send_request(
        app.addr,
        "PUT",
        "/v1/posts/second-post",
        &[("cookie", &cookie)],
        Some(r#"{"slug":"renamed-post","title":"T","body":"<p>b</p>"}"#),
    )
    .await;
    assert_eq!(status, 200);
    let (status, _, _) =
        send_request(app.addr, "GET", "/v1/posts/renamed-post", &[], None).await;
    assert_eq!(status, 200);
    let (status, _, _) =
        send_request(app.addr, "GET", "/v1/posts/second-post", &[], None).await;
    assert_eq!(status, 404);
}

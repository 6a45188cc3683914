//! Shared fixtures: a small website served by axum on a free local port.
#![allow(dead_code)]

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::get,
    Router,
};
use std::path::PathBuf;

/// Routes:
///
/// ```text
/// /             -> /a b /c#top /admin/login /broken, external link
/// /a            -> /a/deep
/// /b            -> leaf
/// /c            -> /notes.txt /old-a /empty
/// /a/deep       -> leaf
/// /admin/login  -> leaf (excluded in tests)
/// /broken       -> 500
/// /old-a        -> 308 to /a
/// /notes.txt    -> text/plain
/// /empty        -> only a script
/// ```
pub fn site_router() -> Router {
    Router::new()
        .route(
            "/",
            get(|| async {
                Html(
                    r#"<html><head><title>Example Home</title>
                    <script>track("home")</script></head>
                    <body>
                      <h1>Welcome to the example homepage</h1>
                      <p>The homepage says hello and lists every section.</p>
                      <nav>
                        <a href="/a">Alpha</a>
                        <a href="b">Bravo</a>
                        <a href="/c#top">Charlie</a>
                        <a href="/admin/login">Admin</a>
                        <a href="/broken">Broken</a>
                        <a href="https://elsewhere.invalid/">Elsewhere</a>
                      </nav>
                    </body></html>"#,
                )
            }),
        )
        .route(
            "/a",
            get(|| async {
                Html(r#"<p>Alpha covers pricing plans and billing.</p><a href="/a/deep">Deeper</a>"#)
            }),
        )
        .route(
            "/b",
            get(|| async { Html("<p>Bravo explains the support contact form.</p>") }),
        )
        .route(
            "/c",
            get(|| async {
                Html(r#"<p>Charlie lists careers.</p><a href="/notes.txt">notes</a><a href="/old-a">old</a><a href="/empty">e</a>"#)
            }),
        )
        .route(
            "/a/deep",
            get(|| async { Html("<p>Deep page about refunds.</p>") }),
        )
        .route(
            "/admin/login",
            get(|| async { Html("<p>Admin login secret</p>") }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/old-a", get(|| async { Redirect::permanent("/a") }))
        .route(
            "/notes.txt",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    "Release notes\n\n  version one  \n",
                )
                    .into_response()
            }),
        )
        .route(
            "/empty",
            get(|| async { Html("<html><body><script>only()</script></body></html>") }),
        )
}

/// Serve [`site_router`] on a background runtime; returns the base URL.
pub fn spawn_site() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, site_router()).await.unwrap();
        });
    });

    format!("http://127.0.0.1:{}/", port)
}

pub fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn site_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("site");
    path
}

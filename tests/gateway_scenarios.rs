//! End-to-end behaviour of the gateway against in-process mock backends.

use std::time::{Duration, Instant};

use issuance_gateway::config::schema::PoolConfig;

mod common;

use common::{
    Behavior, base_config, client, eventually, raw_exchange, start_backend, start_gateway,
};

#[tokio::test]
async fn public_route_passes_through_untouched() {
    let backend = start_backend(Behavior::default()).await;
    let gw = start_gateway(base_config(backend.addr)).await;

    let res = client()
        .get(gw.url("/irma/anything/here?x=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-backend"], "mock");
    assert_eq!(res.text().await.unwrap(), "GET /irma/anything/here?x=1");

    let seen = backend.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path, "/irma/anything/here?x=1");
}

#[tokio::test]
async fn unlisted_principal_is_denied() {
    let backend = start_backend(Behavior::default()).await;
    let gw = start_gateway(base_config(backend.addr)).await;

    let res = client()
        .post(gw.url("/session"))
        .header("x-caller-principal", "someone-else")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client().post(gw.url("/session")).send().await.unwrap();
    assert_eq!(res.status(), 403);

    assert!(backend.requests().is_empty(), "denied requests never reach the backend");
}

#[tokio::test]
async fn dot_segments_cannot_escape_public_route() {
    let backend = start_backend(Behavior::default()).await;
    let gw = start_gateway(base_config(backend.addr)).await;

    for path in ["/irma/../session", "/irma/%2e%2e/session", "/irma/%2E%2E/session"] {
        let request = format!(
            "POST {path} HTTP/1.1\r\nHost: gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
        let status = raw_exchange(gw.addr, request.as_bytes()).await;
        assert!(status.starts_with("HTTP/1.1 404"), "{path}: {status}");
    }

    let status = raw_exchange(
        gw.addr,
        b"POST /session HTTP/1.1\r\nHost: gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(status.starts_with("HTTP/1.1 403"), "{status}");

    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn oversized_chunked_body_is_payload_too_large() {
    let backend = start_backend(Behavior::default()).await;
    let mut config = base_config(backend.addr);
    config.listener.max_body_bytes = 1024;
    let gw = start_gateway(config).await;

    let mut request = b"POST /irma/x HTTP/1.1\r\nHost: gateway\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n1000\r\n".to_vec();
    request.extend(std::iter::repeat(b'a').take(4096));
    request.extend_from_slice(b"\r\n0\r\n\r\n");

    let status = raw_exchange(gw.addr, &request).await;
    assert!(status.starts_with("HTTP/1.1 413"), "{status}");
}

#[tokio::test]
async fn strict_mode_hides_denials() {
    let backend = start_backend(Behavior::default()).await;
    let mut config = base_config(backend.addr);
    config.access.strict_deny_as_not_found = true;
    let gw = start_gateway(config).await;

    let denied = client()
        .post(gw.url("/session"))
        .header("x-caller-principal", "someone-else")
        .send()
        .await
        .unwrap();
    let missing = client().get(gw.url("/nope")).send().await.unwrap();

    assert_eq!(denied.status(), 404);
    assert_eq!(missing.status(), 404);
    assert_eq!(denied.text().await.unwrap(), missing.text().await.unwrap());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn allowed_principal_gets_backend_status() {
    let backend = start_backend(Behavior {
        status: 201,
        body: Some("{\"sessionPtr\":{}}".into()),
        delay: Duration::from_millis(50),
    })
    .await;
    let gw = start_gateway(base_config(backend.addr)).await;

    let res = client()
        .post(gw.url("/session"))
        .header("x-caller-principal", "webapp")
        .header("content-type", "application/json")
        .body("{\"request\":{}}")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 201);
    assert_eq!(res.text().await.unwrap(), "{\"sessionPtr\":{}}");
    assert_eq!(backend.requests()[0].method, "POST");
}

#[tokio::test]
async fn empty_pool_is_unavailable() {
    let backend = start_backend(Behavior::default()).await;
    let mut config = base_config(backend.addr);
    config.pools = vec![PoolConfig {
        name: "issuance".into(),
        targets: vec![],
    }];
    let gw = start_gateway(config).await;

    let res = client()
        .get(gw.url("/session/abc/status"))
        .header("x-caller-principal", "webapp")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
}

#[tokio::test]
async fn slow_backend_times_out_and_connection_is_dropped() {
    let backend = start_backend(Behavior {
        delay: Duration::from_secs(3),
        ..Default::default()
    })
    .await;
    let mut config = base_config(backend.addr);
    config.features.insert("session_delete".into(), true);
    for route in &mut config.routes {
        route.timeout_ms = 200;
    }
    let gw = start_gateway(config).await;

    let started = Instant::now();
    let res = client()
        .delete(gw.url("/session/abc"))
        .header("x-caller-principal", "webapp")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert!(
        eventually(Duration::from_secs(2), || backend.aborted() == 1).await,
        "backend connection should be closed after the timeout"
    );
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let backend = start_backend(Behavior::default()).await;
    let gw = start_gateway(base_config(backend.addr)).await;

    let res = client().get(gw.url("/nope")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    // Flagged-off route behaves like any unknown path.
    let res = client()
        .delete(gw.url("/session/abc"))
        .header("x-caller-principal", "webapp")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn only_allow_listed_headers_reach_backend() {
    let backend = start_backend(Behavior::default()).await;
    let gw = start_gateway(base_config(backend.addr)).await;

    let res = client()
        .get(gw.url("/session/abc/status"))
        .header("x-caller-principal", "webapp")
        .header("authorization", "Bearer token")
        .header("cookie", "session=secret")
        .header("x-forwarded-for", "10.1.1.1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let response_id = res.headers()["x-request-id"].to_str().unwrap().to_string();

    let seen = &backend.requests()[0];
    assert_eq!(seen.header("authorization"), Some("Bearer token"));
    assert_eq!(seen.header("x-request-id"), Some(response_id.as_str()));
    assert_eq!(seen.header("host"), Some(backend.addr.to_string().as_str()));
    assert_eq!(seen.header("cookie"), None);
    assert_eq!(seen.header("x-forwarded-for"), None);
    assert_eq!(seen.header("x-caller-principal"), None);
}

#[tokio::test]
async fn refused_connection_is_bad_gateway() {
    let gw = start_gateway(base_config(common::closed_port().await)).await;

    let res = client().get(gw.url("/irma/x")).send().await.unwrap();
    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn backend_hangup_is_bad_gateway() {
    let addr = common::start_hangup_backend().await;
    let gw = start_gateway(base_config(addr)).await;

    let res = client().get(gw.url("/irma/x")).send().await.unwrap();
    assert_eq!(res.status(), 502);
}

#[tokio::test]
async fn backend_errors_are_relayed_verbatim() {
    let backend = start_backend(Behavior {
        status: 500,
        body: Some("boom".into()),
        ..Default::default()
    })
    .await;
    let gw = start_gateway(base_config(backend.addr)).await;

    let res = client().get(gw.url("/irma/x")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "boom");
}

#[tokio::test]
async fn reload_swaps_routes_and_pools() {
    let old = start_backend(Behavior {
        body: Some("old".into()),
        ..Default::default()
    })
    .await;
    let new = start_backend(Behavior {
        body: Some("new".into()),
        ..Default::default()
    })
    .await;
    let gw = start_gateway(base_config(old.addr)).await;

    let res = client().get(gw.url("/irma/x")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "old");

    let mut config = base_config(new.addr);
    config.features.insert("session_result".into(), true);
    gw.updates.send(config).unwrap();

    let gateway = gw.gateway.clone();
    assert!(eventually(Duration::from_secs(2), || gateway.snapshot().routes.len() == 4).await);

    let res = client().get(gw.url("/irma/x")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "new");

    let res = client()
        .get(gw.url("/session/abc/result"))
        .header("x-caller-principal", "webapp")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let backend = start_backend(Behavior::default()).await;
    let gw = start_gateway(base_config(backend.addr)).await;

    let res = client().get(gw.url("/irma/x")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    gw.shutdown.trigger();
    let url = gw.url("/irma/x");
    let mut refused = false;
    for _ in 0..50 {
        if client().get(&url).send().await.is_err() {
            refused = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(refused, "listener should close after shutdown");
}

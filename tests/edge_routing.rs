//! End-to-end routing tests against live mock origins.

use std::net::SocketAddr;

use edge_booster::config::EdgeConfig;

mod common;

fn config(edge: SocketAddr, default: SocketAddr, mobile: SocketAddr, tw: SocketAddr) -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.listener.bind_address = edge.to_string();
    config.upstream.default = format!("http://{default}/");
    config.upstream.mobile = format!("http://{mobile}/");
    config.routes.clear();
    config.routes.insert("TW".into(), format!("http://{tw}/"));
    config.firewall.blocked_regions = vec!["CN".into()];
    config.firewall.blocked_addresses = vec!["203.0.113.7".into()];
    config
}

#[tokio::test]
async fn region_route_end_to_end() {
    let edge: SocketAddr = "127.0.0.1:28310".parse().unwrap();
    let default: SocketAddr = "127.0.0.1:28311".parse().unwrap();
    let mobile: SocketAddr = "127.0.0.1:28312".parse().unwrap();
    let tw: SocketAddr = "127.0.0.1:28313".parse().unwrap();

    let _default_rx = common::start_echo_upstream(default, "default", true).await;
    let _mobile_rx = common::start_echo_upstream(mobile, "mobile", true).await;
    let mut tw_rx = common::start_echo_upstream(tw, "tw", true).await;
    let _shutdown = common::start_edge(config(edge, default, mobile, tw)).await;

    let res = common::client()
        .get(format!("http://{edge}/Article?lang=zh"))
        .header("cf-ipcountry", "tw")
        .header("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
        .header("x-custom", "kept")
        .send()
        .await
        .expect("edge unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-upstream"], "tw");
    assert_eq!(res.headers()["x-pjax-url"].to_str().unwrap(), format!("http://{edge}/"));
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "tw GET //Article?lang=zh");

    let seen = tw_rx.recv().await.unwrap();
    assert_eq!(seen.header("host"), Some(tw.to_string().as_str()));
    assert_eq!(seen.header("x-custom"), Some("kept"));
    assert_eq!(seen.header("cf-ipcountry"), Some("tw"));
}

#[tokio::test]
async fn unrouted_region_uses_default_origin() {
    let edge: SocketAddr = "127.0.0.1:28320".parse().unwrap();
    let default: SocketAddr = "127.0.0.1:28321".parse().unwrap();
    let mobile: SocketAddr = "127.0.0.1:28322".parse().unwrap();
    let tw: SocketAddr = "127.0.0.1:28323".parse().unwrap();

    let _default_rx = common::start_echo_upstream(default, "default", false).await;
    let _shutdown = common::start_edge(config(edge, default, mobile, tw)).await;

    let client = common::client();
    for region in [Some("DE"), None] {
        let mut req = client.get(format!("http://{edge}/wiki/Rust"));
        if let Some(region) = region {
            req = req.header("cf-ipcountry", region);
        }
        let res = req.send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert!(!res.headers().contains_key("x-pjax-url"));
        assert_eq!(res.text().await.unwrap(), "default GET //wiki/Rust");
    }
}

#[tokio::test]
async fn mobile_client_wins_over_region() {
    let edge: SocketAddr = "127.0.0.1:28330".parse().unwrap();
    let default: SocketAddr = "127.0.0.1:28331".parse().unwrap();
    let mobile: SocketAddr = "127.0.0.1:28332".parse().unwrap();
    let tw: SocketAddr = "127.0.0.1:28333".parse().unwrap();

    let _mobile_rx = common::start_echo_upstream(mobile, "mobile", false).await;
    let _shutdown = common::start_edge(config(edge, default, mobile, tw)).await;

    let res = common::client()
        .get(format!("http://{edge}/Article"))
        .header("cf-ipcountry", "TW")
        .header(
            "user-agent",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148",
        )
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "mobile GET //Article");
}

#[tokio::test]
async fn post_body_is_forwarded() {
    let edge: SocketAddr = "127.0.0.1:28340".parse().unwrap();
    let default: SocketAddr = "127.0.0.1:28341".parse().unwrap();
    let mobile: SocketAddr = "127.0.0.1:28342".parse().unwrap();
    let tw: SocketAddr = "127.0.0.1:28343".parse().unwrap();

    let mut default_rx = common::start_echo_upstream(default, "default", false).await;
    let _shutdown = common::start_edge(config(edge, default, mobile, tw)).await;

    let res = common::client()
        .post(format!("http://{edge}/api/submit"))
        .header("content-type", "application/json")
        .body(r#"{"title":"Rust"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "default POST //api/submit\n{\"title\":\"Rust\"}");

    let seen = default_rx.recv().await.unwrap();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.header("content-type"), Some("application/json"));
    assert_eq!(seen.body, br#"{"title":"Rust"}"#);
}

#[tokio::test]
async fn concurrent_requests_are_routed_independently() {
    let edge: SocketAddr = "127.0.0.1:28350".parse().unwrap();
    let default: SocketAddr = "127.0.0.1:28351".parse().unwrap();
    let mobile: SocketAddr = "127.0.0.1:28352".parse().unwrap();
    let tw: SocketAddr = "127.0.0.1:28353".parse().unwrap();

    let _default_rx = common::start_echo_upstream(default, "default", false).await;
    let _tw_rx = common::start_echo_upstream(tw, "tw", false).await;
    let _shutdown = common::start_edge(config(edge, default, mobile, tw)).await;

    let client = common::client();
    let mut handles = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let region = if i % 2 == 0 { "TW" } else { "US" };
            let res = client
                .get(format!("http://{edge}/page/{i}"))
                .header("cf-ipcountry", region)
                .send()
                .await
                .unwrap();
            (i, res.text().await.unwrap())
        }));
    }

    for handle in handles {
        let (i, body) = handle.await.unwrap();
        let tag = if i % 2 == 0 { "tw" } else { "default" };
        assert_eq!(body, format!("{tag} GET //page/{i}"));
    }
}

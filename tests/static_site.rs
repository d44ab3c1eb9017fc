//! Static asset and history fallback integration tests.

use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn files_fallback_and_exclusions() {
    let web = common::bundle();
    let gateway = common::start_gateway(common::gateway_config(web.path(), None)).await;
    let client = reqwest::Client::new();

    let response = client.get(gateway.url("/app.js")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), common::APP_JS);

    let response = client.get(gateway.url("/dashboard/42")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), common::INDEX_HTML);

    let response = client
        .get(gateway.url("/resources/scada-symbols/tenant/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_ne!(response.text().await.unwrap(), common::INDEX_HTML);

    assert_eq!(gateway.stop().await, 0);
}

#[tokio::test]
async fn excluded_paths_still_serve_real_files() {
    let web = common::bundle();
    let symbols = web.path().join("resources/scada-symbols/system");
    std::fs::create_dir_all(&symbols).unwrap();
    std::fs::write(symbols.join("pump.svg"), "<svg/>").unwrap();
    let gateway = common::start_gateway(common::gateway_config(web.path(), None)).await;

    let response = reqwest::get(gateway.url("/resources/scada-symbols/system/pump.svg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<svg/>");

    gateway.stop().await;
}

#[tokio::test]
async fn non_navigation_misses_are_not_found() {
    let web = common::bundle();
    let gateway = common::start_gateway(common::gateway_config(web.path(), None)).await;
    let client = reqwest::Client::new();

    let response = client
        .get(gateway.url("/missing.json"))
        .header("accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.post(gateway.url("/dashboard")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    gateway.stop().await;
}

#[tokio::test]
async fn range_requests_are_honoured() {
    let web = common::bundle();
    let gateway = common::start_gateway(common::gateway_config(web.path(), None)).await;

    let response = reqwest::Client::new()
        .get(gateway.url("/app.js"))
        .header("range", "bytes=0-6")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.text().await.unwrap(), "console");

    gateway.stop().await;
}

#![cfg(feature = "web-api")]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use once_cell::sync::Lazy;
use regex::Regex;

use proxysub::models::AppState;
use proxysub::web_handlers::interfaces;
use proxysub::Settings;

const TEMPLATE: &str = r#"mixed-port: 7890
proxy-providers:
  机场:
    type: http
    interval: 86400
    path: ./providers/airport.yaml
proxy-groups:
  - name: 节点选择
    type: select
    proxies: [DIRECT]
    use: []
rules:
  - MATCH,节点选择
"#;

const SERVER_SUBS: &str = r#"proxy-providers:
  - https://example.com/server-sub
proxies:
  - {name: ServerHome, type: http, server: 192.0.2.10, port: 3128}
"#;

const BOUNDARY: &str = "proxysub-test-boundary";

/// Working directory shared by every test; the global settings point into it.
static FIXTURE: Lazy<PathBuf> = Lazy::new(|| {
    let dir = tempfile::tempdir().unwrap().into_path();
    fs::write(dir.join("template.yaml"), TEMPLATE).unwrap();
    fs::write(dir.join("subs.yaml"), SERVER_SUBS).unwrap();
    fs::create_dir_all(dir.join("temp")).unwrap();

    let mut settings = Settings::new();
    settings.template_path = dir.join("template.yaml").to_string_lossy().into_owned();
    settings.subs_path = dir.join("subs.yaml").to_string_lossy().into_owned();
    settings.temp_dir = dir.join("temp").to_string_lossy().into_owned();
    settings.output_path = dir.join("temp/sub.yaml").to_string_lossy().into_owned();
    settings.max_upload_size = 4096;
    *Settings::current_mut() = Arc::new(settings);
    dir
});

fn multipart_body(field: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"subs.yaml\"\r\nContent-Type: application/x-yaml\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = field,
        c = content
    )
}

fn upload_request(field: &str, content: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/upload")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(field, content))
}

#[cfg(test)]
mod web_tests {
    use super::*;

    macro_rules! app {
        ($ttl:expr) => {{
            Lazy::force(&FIXTURE);
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Arc::new(AppState::new($ttl))))
                    .configure(interfaces::config),
            )
            .await
        }};
    }

    fn token_of(page: &str) -> String {
        let re = Regex::new(r"([A-Za-z0-9]{10})\.yaml").unwrap();
        re.captures(page)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| panic!("no download link in {}", page))
    }

    #[actix_web::test]
    async fn test_index_page() {
        let app = app!(Duration::from_secs(60));
        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains(r#"enctype="multipart/form-data""#));
    }

    #[actix_web::test]
    async fn test_static_subscription() {
        let app = app!(Duration::from_secs(60));
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/sub.yaml").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            r#"attachment; filename="sub.yaml""#
        );
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("url: https://example.com/server-sub"));
        assert!(body.contains("dialer-proxy: 西部牛仔"));
        assert!(body.contains("  use: [机场]\n"));
    }

    #[actix_web::test]
    async fn test_upload_then_download_once() {
        let app = app!(Duration::from_secs(60));
        let subs = "proxies:\n  - {name: Home, type: http, server: 192.0.2.1, port: 8080}\n  - {name: US-1, type: http, server: 192.0.2.2, port: 80}\n";
        let resp = test::call_service(&app, upload_request("file", subs).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(page.contains("生成成功"));
        let token = token_of(&page);

        let uri = format!("/{}.yaml", token);
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("name: 西部牛仔"));
        assert!(body.contains("url: http://192.0.2.1:8080/"));
        assert!(body.contains("  proxies: [DIRECT, Home]\n"));
        assert!(!body.contains("ServerHome"));

        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = test::read_body(resp).await;
        assert_eq!(body, "Not found or already downloaded");
    }

    #[actix_web::test]
    async fn test_expired_link_is_gone() {
        let app = app!(Duration::ZERO);
        let resp = test::call_service(&app, upload_request("file", "proxies: [{name: Home}]\n").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        let uri = format!("/{}.yaml", token_of(&page));

        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_unknown_token() {
        let app = app!(Duration::from_secs(60));
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/abcdefghij.yaml").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_upload_rejections() {
        let app = app!(Duration::from_secs(60));

        let resp = test::call_service(&app, upload_request("other", "proxies: []\n").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(page.contains("缺少上传文件：file"));

        let resp = test::call_service(&app, upload_request("file", "proxies: [{name: Home}\n").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(page.contains("Invalid YAML"));

        let resp = test::call_service(&app, upload_request("file", "proxies: [{server: x}]\n").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, upload_request("file", "- just\n- a list\n").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let oversized = format!("proxies: [{{name: Home}}]\n#{}\n", "x".repeat(5000));
        let resp = test::call_service(&app, upload_request("file", &oversized).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}

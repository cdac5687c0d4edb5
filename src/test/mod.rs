use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use crate::{
    api::error,
    constants::GithubEnv,
    modules::upstream::{ImageHost, ImageUpload},
};

pub fn github_env(api_url: &str) -> GithubEnv {
    GithubEnv {
        token: "secret".into(),
        owner: "octo".into(),
        repo: "gallery".into(),
        branch: "main".into(),
        api_url: api_url.into(),
        raw_url: "https://raw.githubusercontent.com".into(),
        index_path: "gallery-index.json".into(),
    }
}

/// In-process host that counts calls and can be switched to fail.
#[derive(Default)]
pub struct FakeHost {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait::async_trait]
impl ImageHost for FakeHost {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn store(&self, upload: &ImageUpload) -> Result<String, error::SystemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(error::SystemError::upstream("fake host is down"));
        }
        Ok(format!("https://files.example/{}", upload.stored_name))
    }
}

pub fn memory_service() -> (crate::modules::image::service::ImageService, Arc<FakeHost>) {
    use crate::modules::image::{
        model::UploadConfig, repository_memory::ImageRepositoryMemory, service::ImageService,
    };

    let host = Arc::new(FakeHost::default());
    let service = ImageService::with_dependencies(
        Arc::new(ImageRepositoryMemory::new()),
        host.clone(),
        UploadConfig::default().with_share_base_url("https://gallery.example/"),
    );
    (service, host)
}

mod api_tests {
    use actix_web::{http::header, http::StatusCode, test, web, App};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::{json, Value};

    use super::*;
    use crate::modules::image::route;

    macro_rules! init_app {
        ($service:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($service))
                    .service(web::scope("/api").configure(route::configure)),
            )
            .await
        };
    }

    const BOUNDARY: &str = "XRELAYBOUNDARY";

    fn multipart_body(file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/images/upload")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
    }

    fn data_url_request(bytes: &[u8]) -> test::TestRequest {
        test::TestRequest::post().uri("/api/images/upload").set_json(json!({
            "file": format!("data:image/png;base64,{}", STANDARD.encode(bytes)),
            "custom_name": "tiny.png",
        }))
    }

    #[actix_web::test]
    async fn data_url_upload_returns_record_and_share_url() {
        let (service, host) = memory_service();
        let app = init_app!(service);

        let resp = test::call_service(&app, data_url_request(&[1u8; 10]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let code = body["image"]["short_code"].as_str().unwrap().to_string();
        assert_eq!(body["success"], true);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(body["image"]["size"], 10);
        assert_eq!(body["image"]["original_name"], "tiny.png");
        assert_eq!(body["shareUrl"], format!("https://gallery.example/preview/{code}"));
        assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn blank_custom_name_falls_back_to_stored_name() {
        let (service, host) = memory_service();
        let app = init_app!(service);

        let req = test::TestRequest::post()
            .uri("/api/images/upload")
            .set_json(json!({
                "file": format!("data:image/png;base64,{}", STANDARD.encode([1u8; 10])),
                "custom_name": "",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let name = body["image"]["original_name"].as_str().unwrap();
        let stem = name.strip_suffix(".png").unwrap();
        assert!(!stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()), "got {name}");
        assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn data_url_one_byte_over_limit_never_reaches_host() {
        let (service, host) = memory_service();
        let limit = service.config().max_data_url_size;
        let app = init_app!(service);

        let resp =
            test::call_service(&app, data_url_request(&vec![0u8; limit + 1]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn malformed_data_url_is_bad_request() {
        let (service, host) = memory_service();
        let app = init_app!(service);

        let req = test::TestRequest::post()
            .uri("/api/images/upload")
            .set_json(json!({ "file": "not-a-data-url" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn multipart_upload_guesses_type_from_filename() {
        let (service, host) = memory_service();
        let app = init_app!(service);

        let body = multipart_body("cat photo.png", "application/octet-stream", b"PNGDATA123");
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["image"]["original_name"], "cat_photo.png");
        assert_eq!(body["image"]["size"], 10);
        assert!(body["image"]["remote_url"].as_str().unwrap().ends_with(".png"));
        assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn multipart_over_limit_is_rejected() {
        let (service, host) = memory_service();
        let limit = service.config().max_multipart_size;
        let app = init_app!(service);

        let body = multipart_body("big.png", "image/png", &vec![0u8; limit + 1]);
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn multipart_rejects_non_images() {
        let (service, host) = memory_service();
        let app = init_app!(service);

        let body = multipart_body("notes.txt", "text/plain", b"hello");
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn unsupported_content_type_is_bad_request() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        let req = test::TestRequest::post()
            .uri("/api/images/upload")
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload("hello")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn upstream_failure_is_reported_with_detail() {
        let (service, host) = memory_service();
        host.fail.store(true, Ordering::SeqCst);
        let app = init_app!(service);

        let resp = test::call_service(&app, data_url_request(&[1u8; 10]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Upstream request failed");
        assert_eq!(body["message"], "fake host is down");

        let req = test::TestRequest::get().uri("/api/images").to_request();
        let list: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(list.is_empty());
    }

    #[actix_web::test]
    async fn unknown_short_code_is_not_found() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        let req = test::TestRequest::get().uri("/api/images/ZZZZZZ").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Not Found");
    }

    #[actix_web::test]
    async fn delete_removes_record() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        let uploaded: Value =
            test::call_and_read_body_json(&app, data_url_request(&[1u8; 10]).to_request()).await;
        let id = uploaded["image"]["id"].as_i64().unwrap();
        let code = uploaded["image"]["short_code"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri(&format!("/api/images/{code}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete().uri(&format!("/api/images/{id}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["deleted"]["short_code"], code.as_str());

        let req = test::TestRequest::get().uri(&format!("/api/images/{code}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/images").to_request();
        let list: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(list.iter().all(|r| r["id"] != id));

        let req = test::TestRequest::delete().uri(&format!("/api/images/{id}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn delete_with_non_integer_id_is_not_found() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        let req = test::TestRequest::delete().uri("/api/images/abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "Image not found");
    }

    #[actix_web::test]
    async fn list_is_newest_first() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        let req = test::TestRequest::post()
            .uri("/api/images/migrate")
            .set_json(json!({ "images": [
                {
                    "remote_url": "https://qu.ax/1.png",
                    "short_code": "OLD111",
                    "uploaded_at": "2023-01-01T00:00:00Z"
                },
                {
                    "remote_url": "https://qu.ax/3.png",
                    "short_code": "NEW333",
                    "uploaded_at": "2025-01-01T00:00:00Z"
                },
                {
                    "remote_url": "https://qu.ax/2.png",
                    "short_code": "MID222",
                    "uploaded_at": "2024-01-01T00:00:00Z"
                },
            ]}))
            .to_request();
        let migrated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(migrated["migrated"], 3);

        let req = test::TestRequest::get().uri("/api/images").to_request();
        let list: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        let codes: Vec<&str> = list.iter().map(|r| r["short_code"].as_str().unwrap()).collect();
        assert_eq!(codes, vec!["NEW333", "MID222", "OLD111"]);
    }

    #[actix_web::test]
    async fn migrate_rejects_non_array() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        for body in [json!({ "images": { "original_name": "x.png" } }), json!({})] {
            let req =
                test::TestRequest::post().uri("/api/images/migrate").set_json(body).to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        }

        let req = test::TestRequest::get().uri("/api/images").to_request();
        let list: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(list.is_empty());
    }

    #[actix_web::test]
    async fn migrate_reports_failures_per_record() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        let req = test::TestRequest::post()
            .uri("/api/images/migrate")
            .set_json(json!({ "images": [
                { "original_name": "ok.png", "quax_url": "https://qu.ax/ok.png" },
                { "original_name": "missing.png" },
            ]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["migrated"], 1);
        assert_eq!(body["results"][0]["status"], "migrated");
        assert_eq!(body["results"][0]["remote_url"], "https://qu.ax/ok.png");
        assert_eq!(body["results"][0]["size"], 0);
        assert_eq!(body["results"][1]["status"], "failed");
        assert_eq!(body["results"][1]["original_name"], "missing.png");
    }

    #[actix_web::test]
    async fn health_reports_backends_and_count() {
        let (service, _) = memory_service();
        let app = init_app!(service);

        test::call_service(&app, data_url_request(&[1u8; 10]).to_request()).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "status": "ok", "images": 1, "host": "fake", "index": "memory" }));
    }
}

// tests/common/mod.rs
//
// Sobe o router real sobre stores em memória e oferece atalhos para
// montar requisições JSON e multipart.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use goldtrace::{
    config::{AppState, HttpSettings},
    db::{MemoryStore, Stores},
    routes::router,
    services::auth::AuthSettings,
    storage::MemoryObjectStore,
};

pub const BOUNDARY: &str = "goldtrace-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub objects: Arc<MemoryObjectStore>,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let objects = Arc::new(MemoryObjectStore::new());

    let state = AppState::from_parts(
        Stores::memory(store),
        objects.clone(),
        AuthSettings {
            jwt_secret: "integration-secret".into(),
            access_ttl: chrono::Duration::hours(20),
            refresh_ttl: chrono::Duration::days(7),
            bcrypt_cost: 4,
            // Os testes criam dealers e goldbods pelo registro
            open_role_registration: true,
        },
        HttpSettings::default(),
    );

    TestApp {
        router: router(state),
        objects,
    }
}

/// Uma parte de arquivo do formulário multipart.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_body(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn png(field: &'static str) -> FilePart<'static> {
    FilePart {
        field,
        file_name: "scan.png",
        content_type: "image/png",
        bytes: b"\x89PNG fake image",
    }
}

pub fn pdf(field: &'static str) -> FilePart<'static> {
    FilePart {
        field,
        file_name: "report.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.4 fake report",
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.json(Method::GET, uri, Some(token), None).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        files: &[FilePart<'_>],
    ) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, files)))
            .unwrap();
        self.send(request).await
    }

    // ---
    // Atalhos de cenário
    // ---

    /// Registra e faz login; devolve o token de acesso.
    pub async fn user(&self, username: &str, role: &str) -> String {
        let registered = self
            .json(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": username, "password": "secret1", "role": role })),
            )
            .await;
        assert_eq!(registered.status, StatusCode::OK, "{:?}", registered.body);

        let login = self
            .json(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": "secret1" })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        login.body["token"].as_str().unwrap().to_owned()
    }

    pub async fn create_mine(&self, token: &str, name: &str) -> i64 {
        let res = self
            .json(
                Method::POST,
                "/mines",
                Some(token),
                Some(json!({
                    "name": name,
                    "type": "alluvial",
                    "location": "Obuasi",
                    "license_number": "MC-2024-0193",
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    pub async fn register_batch(&self, token: &str, mine_id: i64) -> Response {
        let mine_id = mine_id.to_string();
        self.multipart(
            Method::POST,
            "/batches",
            token,
            &[
                ("mine_id", mine_id.as_str()),
                ("date_collected", "2024-01-01"),
                ("weight_kg", "12.5"),
            ],
            &[png("origin_cert")],
        )
        .await
    }

    pub async fn invite_dealer(&self, token: &str, batch_id: i64, dealer: &str) -> Response {
        self.json(
            Method::POST,
            &format!("/batches/{batch_id}/invite-dealer"),
            Some(token),
            Some(json!({ "dealer_username": dealer })),
        )
        .await
    }

    pub async fn invite_goldbod(&self, token: &str, batch_id: i64, goldbod: &str) -> Response {
        self.json(
            Method::POST,
            &format!("/batches/{batch_id}/invite-goldbod"),
            Some(token),
            Some(json!({ "goldbod_username": goldbod })),
        )
        .await
    }

    pub async fn decide(&self, token: &str, queue: &str, id: i64, action: &str) -> Response {
        self.json(
            Method::PATCH,
            &format!("/{queue}/{id}/{action}"),
            Some(token),
            None,
        )
        .await
    }

    pub async fn dealer_receive(&self, token: &str, batch_id: i64) -> Response {
        self.multipart(
            Method::PATCH,
            &format!("/batches/{batch_id}/dealer-receive"),
            token,
            &[
                ("dealer_location", "Kumasi"),
                ("dealer_received_weight", "12.4"),
                ("dealer_receipt_id", "RCPT-1"),
            ],
            &[png("dealer_license")],
        )
        .await
    }

    pub async fn transport(&self, token: &str, batch_id: i64) -> Response {
        self.json(
            Method::PATCH,
            &format!("/batches/{batch_id}/transport"),
            Some(token),
            Some(json!({
                "transport_courier": "DHL",
                "transport_tracking_number": "TRK-9",
                "transport_origin_location": "Kumasi",
                "transport_destination_location": "Accra",
            })),
        )
        .await
    }

    pub async fn goldbod_intake(&self, token: &str, batch_id: i64) -> Response {
        self.json(
            Method::PATCH,
            &format!("/batches/{batch_id}/goldbod-intake"),
            Some(token),
            Some(json!({
                "goldbod_intake_officer": "Officer Mensah",
                "goldbod_intake_weight": 12.3,
                "goldbod_intake_receipt_id": "GB-77",
            })),
        )
        .await
    }

    pub async fn assay(&self, token: &str, batch_id: i64) -> Response {
        self.multipart(
            Method::PATCH,
            &format!("/batches/{batch_id}/assay"),
            token,
            &[("purity_percent", "91.6")],
            &[pdf("assay_report")],
        )
        .await
    }
}

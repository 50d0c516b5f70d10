#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use manufacturing_hub::{app_router, config::AppConfig, db, AppState};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const SESSION_SECRET: &str = "integration_suite_session_secret_0123456789abcdef";

/// Helper harness for spinning up the application over an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    hub_id: Uuid,
    token: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same as [`TestApp::new`] after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            SESSION_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let hub_id = Uuid::new_v4();
        let token = state
            .auth
            .issue_session(hub_id, "tester", Some("manager"))
            .expect("issue test session");

        Self {
            router: app_router(state.clone()),
            state,
            hub_id,
            token,
        }
    }

    /// Hub of the default session.
    pub fn hub_id(&self) -> Uuid {
        self.hub_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// A session token for another hub.
    pub fn token_for(&self, hub_id: Uuid) -> String {
        self.state
            .auth
            .issue_session(hub_id, "other", None)
            .expect("issue test session")
    }

    /// Send a request with an optional bearer token, extra headers and a form body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        form: Option<&[(&str, &str)]>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = match form {
            Some(pairs) => {
                builder = builder.header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                );
                Body::from(encode_form(pairs))
            }
            None => Body::empty(),
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Method::GET, uri, Some(self.token()), &[], None)
            .await
    }

    pub async fn get_hx(&self, uri: &str, target: Option<&str>) -> Response {
        let mut headers = vec![("HX-Request", "true")];
        if let Some(target) = target {
            headers.push(("HX-Target", target));
        }
        self.send(Method::GET, uri, Some(self.token()), &headers, None)
            .await
    }

    pub async fn post_form(&self, uri: &str, form: &[(&str, &str)]) -> Response {
        self.send(Method::POST, uri, Some(self.token()), &[], Some(form))
            .await
    }

    /// GET as JSON, asserting a 200.
    pub async fn get_json(&self, uri: &str) -> Value {
        let response = self.get(uri).await;
        assert_eq!(response.status(), 200, "GET {uri}");
        body_json(response).await
    }

    /// Creates a BOM through the HTTP surface and returns its id.
    pub async fn create_bom(&self, name: &str, code: &str) -> Uuid {
        let response = self
            .post_form(
                "/manufacturing/bom/add/",
                &[
                    ("name", name),
                    ("code", code),
                    ("output_quantity", "10"),
                    ("is_active", "on"),
                ],
            )
            .await;
        assert_eq!(response.status(), 200);
        self.find_id("/manufacturing/bom/?per_page=100", "bill_of_materialses", "code", code)
            .await
    }

    /// Looks up the id of the listed record whose `field` equals `value`.
    pub async fn find_id(&self, list_uri: &str, key: &str, field: &str, value: &str) -> Uuid {
        let payload = self.get_json(list_uri).await;
        let id = items(&payload, key)
            .iter()
            .find(|item| item[field] == value)
            .and_then(|item| item["id"].as_str())
            .unwrap_or_else(|| panic!("no {key} with {field}={value}"))
            .to_string();
        Uuid::parse_str(&id).expect("listed id is a uuid")
    }
}

pub fn encode_form(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf-8 body")
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

/// Listed records of a list payload.
pub fn items<'a>(payload: &'a Value, key: &str) -> &'a Vec<Value> {
    payload["data"][key]
        .as_array()
        .unwrap_or_else(|| panic!("payload has no `{key}` list: {payload}"))
}

/// Rendered rows of a list payload.
pub fn rows(payload: &Value) -> Vec<Vec<String>> {
    serde_json::from_value(payload["data"]["rows"].clone()).expect("rows")
}

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use common_auth::{
    hash_password, AccountKind, EmployeeRole, JwtConfig, JwtVerifier, TokenSigner, TokenSubject,
};
use common_store::bson::{doc, oid::ObjectId, DateTime};
use common_store::{DocumentStore, MemoryStore};
use hotel_service::accounts::{CUSTOMERS, EMPLOYEES};
use hotel_service::config::ServiceConfig;
use hotel_service::metrics::ServiceMetrics;
use hotel_service::{build_router, AppState};
use http_body_util::BodyExt;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::Value;
use tower::ServiceExt;

pub const PIN: &str = "12345";

struct KeyPair {
    private_pem: String,
    public_pem: String,
}

fn key_pair() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();
        KeyPair {
            private_pem: private_key
                .to_pkcs1_pem(LineEnding::LF)
                .expect("private pem")
                .to_string(),
            public_pem: public_key.to_pkcs1_pem(LineEnding::LF).expect("public pem"),
        }
    })
}

fn pin_digest() -> &'static str {
    static DIGEST: OnceLock<String> = OnceLock::new();
    DIGEST.get_or_init(|| hash_password(PIN).expect("hash"))
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Response {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies()
            .into_iter()
            .find(|cookie| cookie.starts_with(&prefix))
    }

    pub fn error_type(&self) -> &str {
        self.body["errors"][0]["type"].as_str().unwrap_or_default()
    }

    pub fn error_location(&self) -> &Value {
        &self.body["errors"][0]["location"]
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub signer: Arc<TokenSigner>,
    pub metrics: Arc<ServiceMetrics>,
}

impl TestApp {
    pub fn new() -> Self {
        let keys = key_pair();
        let jwt = JwtConfig::default();
        let signer = Arc::new(
            TokenSigner::from_pem(jwt.clone(), keys.private_pem.as_bytes()).expect("signer"),
        );
        let verifier =
            Arc::new(JwtVerifier::from_pem(jwt, keys.public_pem.as_bytes()).expect("verifier"));
        let store = MemoryStore::new();
        let metrics = Arc::new(ServiceMetrics::new().expect("metrics"));

        let state = AppState {
            store: Arc::new(store.clone()),
            jwt_verifier: verifier,
            token_signer: signer.clone(),
            config: Arc::new(ServiceConfig::local()),
            metrics: metrics.clone(),
        };

        Self {
            router: build_router(state),
            store,
            signer,
            metrics,
        }
    }

    pub async fn seed_employee(&self, phone_number: &str, roles: &[EmployeeRole]) -> ObjectId {
        let roles: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
        let now = DateTime::now();
        self.store
            .insert_one(
                EMPLOYEES,
                doc! {
                    "first_name": "abebe",
                    "last_name": "kebede",
                    "phone_number": phone_number,
                    "roles": roles,
                    "is_active": true,
                    "password": pin_digest(),
                    "created_at": now,
                    "updated_at": now,
                },
            )
            .await
            .expect("seed employee")
    }

    pub async fn seed_customer(&self, phone_number: &str) -> ObjectId {
        self.store
            .insert_one(
                CUSTOMERS,
                doc! {
                    "first_name": "sara",
                    "nationality": "ethiopian",
                    "passport_number": "EP1234567",
                    "phone_number": phone_number,
                    "is_active": true,
                    "password": pin_digest(),
                },
            )
            .await
            .expect("seed customer")
    }

    pub fn access_cookie(&self, id: ObjectId, account: AccountKind) -> String {
        let subject = TokenSubject::new(id.to_hex(), account);
        let token = self
            .signer
            .issue_access(&subject, Duration::minutes(5))
            .expect("access token");
        format!("access_token={}", token.token)
    }

    pub fn employee_cookie(&self, id: ObjectId) -> String {
        self.access_cookie(id, AccountKind::Employee)
    }

    /// An employee holding `roles` plus a cookie that authenticates them.
    pub async fn employee_with(&self, phone_number: &str, roles: &[EmployeeRole]) -> (ObjectId, String) {
        let id = self.seed_employee(phone_number, roles).await;
        (id, self.employee_cookie(id))
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: &str) -> Response {
        self.send(Method::GET, uri, Some(cookie), None).await
    }

    pub async fn post(&self, uri: &str, cookie: &str, body: Value) -> Response {
        self.send(Method::POST, uri, Some(cookie), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, cookie: &str, body: Value) -> Response {
        self.send(Method::PATCH, uri, Some(cookie), Some(body)).await
    }
}

#![allow(dead_code)]

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    cookie::{Cookie, Key},
    dev::{Service, ServiceResponse},
    http::{header, StatusCode},
    test, web, App, Error,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

use toytrader::{
    auth::Credentials,
    routes::{self, MethodOverride},
    session::{session_middleware, MemorySessionStore, RejectionFlash, SESSION_COOKIE},
    state::AppState,
    store::{MemoryStore, ToyStore},
    upload::ImageStore,
};

/// Lowest cost bcrypt accepts; keeps the tests fast.
pub const TEST_BCRYPT_COST: u32 = 4;

pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

/// Shared state for one test: in-memory stores and a throwaway public directory.
pub struct TestContext {
    pub state: web::Data<AppState>,
    pub toys: Arc<dyn ToyStore>,
    pub sessions: MemorySessionStore,
    pub key: Key,
    pub public_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let public_dir = tempfile::tempdir().expect("Failed to create public dir");
        let credentials =
            Credentials::new(store.clone(), TEST_BCRYPT_COST).expect("Failed to hash dummy password");
        let images = ImageStore::new(public_dir.path(), 1024 * 1024);
        let toys: Arc<dyn ToyStore> = store;

        Self {
            state: web::Data::new(AppState::new(credentials, toys.clone(), images)),
            toys,
            sessions: MemorySessionStore::new(),
            key: Key::generate(),
            public_dir,
        }
    }

    /// Number of files currently in the uploads directory.
    pub fn uploaded_files(&self) -> usize {
        std::fs::read_dir(self.public_dir.path().join("uploads"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub async fn init_app(
    ctx: &TestContext,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .wrap(RejectionFlash)
            .wrap(session_middleware(ctx.sessions.clone(), ctx.key.clone(), 1, false))
            .wrap(MethodOverride)
            .configure(routes::config),
    )
    .await
}

/// What the tests look at in a response.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

impl Reply {
    pub fn errors(&self) -> Vec<String> {
        strings(&self.body["error"])
    }

    pub fn successes(&self) -> Vec<String> {
        strings(&self.body["success"])
    }

    pub fn toy_names(&self) -> Vec<String> {
        self.body["data"]["toys"]
            .as_array()
            .map(|toys| {
                toys.iter()
                    .filter_map(|toy| toy["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[track_caller]
    pub fn assert_redirect(&self, location: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location.as_deref(), Some(location));
    }
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// A browser: remembers the session cookie between requests.
#[derive(Default)]
pub struct Visitor {
    cookie: Option<Cookie<'static>>,
}

impl Visitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn send<S, B>(&mut self, app: &S, req: test::TestRequest) -> Reply
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
        B: MessageBody,
    {
        let req = match &self.cookie {
            Some(cookie) => req.cookie(cookie.clone()),
            None => req,
        };

        let res = test::call_service(app, req.to_request()).await;

        if let Some(cookie) = res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE)
        {
            self.cookie = Some(cookie.into_owned());
        }

        let status = res.status();
        let location = res
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = test::read_body(res).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Reply {
            status,
            location,
            body,
        }
    }

    pub async fn get<S, B>(&mut self, app: &S, uri: &str) -> Reply
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
        B: MessageBody,
    {
        self.send(app, test::TestRequest::get().uri(uri)).await
    }

    pub async fn register<S, B>(&mut self, app: &S, username: &str, password: &str) -> Reply
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
        B: MessageBody,
    {
        let req = test::TestRequest::post()
            .uri("/registerT")
            .set_form([("username", username), ("password", password)]);
        self.send(app, req).await
    }

    pub async fn login<S, B>(&mut self, app: &S, username: &str, password: &str) -> Reply
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
        B: MessageBody,
    {
        let req = test::TestRequest::post()
            .uri("/loginT")
            .set_form([("username", username), ("password", password)]);
        self.send(app, req).await
    }
}

/// Builds a `multipart/form-data` body the way a browser submits the toy forms.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "toytrader-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    /// The complete post form for a toy with a PNG image.
    pub fn toy(name: &str, rent_price: &str, sale_price: &str) -> Self {
        Self::new()
            .text("toyname", name)
            .text("rentprice", rent_price)
            .text("saleprice", sale_price)
            .file("myImage", "robot.png", "image/png", PNG_BYTES)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// A `POST` to `uri` carrying this form.
    pub fn post(mut self, uri: &str) -> test::TestRequest {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            ))
            .set_payload(self.body)
    }
}

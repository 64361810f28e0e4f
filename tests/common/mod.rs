#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use webdispatch::auth::{TicketCodec, TicketConfig};
use webdispatch::{controller, Body, CorsFilter, Dispatcher, Request, Response};

pub const KEY: [u8; 16] = [
    0x6c, 0xf8, 0x05, 0x1b, 0x4a, 0xae, 0xc0, 0xa9, 0x7f, 0x47, 0x94, 0x8d, 0x11, 0xdf, 0xe0, 0x0a,
];

pub fn codec() -> TicketCodec {
    TicketCodec::new(TicketConfig::new(KEY.to_vec())).unwrap()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestModel {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Tester")]
    pub tester: Value,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Sample REST controller with a call counter.
#[derive(Default)]
pub struct TestController {
    testme: AtomicI64,
}

#[controller]
impl TestController {
    #[action("TestRequest")]
    pub fn test_request(&self, request: Request) -> Response {
        let id = self.testme.fetch_add(1, Ordering::SeqCst) + 1;
        let tester = request.data.get("Tester").cloned().unwrap_or(Value::Null);
        Response::json(200, json!({ "Id": id, "Tester": tester }))
    }

    #[action("TestModel")]
    pub fn test_model(&self, _id: i32, model: Body<TestModel>) -> Response {
        let mut model = model.into_inner();
        model.id = self.testme.fetch_add(1, Ordering::SeqCst) + 1;
        Response::with_data(201, &model)
    }

    pub fn get(&self, id: i64, test: String) -> Response {
        Response::with_data(
            200,
            &TestModel {
                id,
                tester: Value::String(test),
            },
        )
    }

    pub fn post(&self, model: Body<TestModel>) -> Response {
        Response::with_data(201, &model.into_inner())
    }

    pub fn put(&self, _id: i64, model: Body<TestModel>) -> Response {
        Response::with_data(202, &model.into_inner())
    }

    pub fn delete(&self, _id: i64) -> Response {
        Response::new(210)
    }

    #[action(skip)]
    pub fn calls(&self) -> i64 {
        self.testme.load(Ordering::SeqCst)
    }
}

/// Sample application: global CORS, `POST /auth/` sign-in, ticket-protected
/// `/func/` and REST routes on `/rest/{id}/{test}`.
pub fn sample_dispatcher() -> (Dispatcher, Arc<TestController>) {
    let controller = Arc::new(TestController::default());
    let mut dispatcher = Dispatcher::new();
    dispatcher.filters_mut().add(CorsFilter::new());

    let signer = codec();
    let router = dispatcher.router_mut();
    router
        .add_route("/auth/")
        .unwrap()
        .for_method("post")
        .to_fn(move |credentials: Body<Credentials>| {
            if credentials.username.is_empty() || credentials.password != "secret" {
                return Response::error(401, "bad credentials");
            }
            match signer.signin(&credentials.username) {
                Ok(ticket) => Response::json(200, json!({ "ticket": ticket })),
                Err(err) => Response::error(400, err.to_string()),
            }
        });
    router
        .add_route("/func/")
        .unwrap()
        .to_method(&controller, "TestModel")
        .unwrap()
        .with_filter(codec());
    router
        .add_rest_routes("/rest/{id}/{test}", &controller)
        .unwrap();

    (dispatcher, controller)
}

pub fn http_request(method: &str, uri: &str, body: Option<&str>) -> http::Request<Vec<u8>> {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    builder
        .body(body.unwrap_or_default().as_bytes().to_vec())
        .unwrap()
}

pub fn json_body(response: &http::Response<Vec<u8>>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

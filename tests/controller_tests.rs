mod common;

use std::sync::Arc;

use common::TestController;
use serde_json::json;
use webdispatch::{controller, Controller, Request, Response, RouteError, Router};

struct Greeter {
    greeting: &'static str,
}

#[controller]
impl Greeter {
    pub fn say_hello(&self, name: String) -> Response {
        Response::text(200, format!("{} {name}", self.greeting))
    }

    #[action("Shout")]
    pub fn loud(&self, name: String) -> Response {
        Response::text(200, format!("{} {}!", self.greeting, name.to_uppercase()))
    }

    #[action(skip)]
    pub fn greeting(&self) -> &'static str {
        self.greeting
    }

    // not public: not an action
    fn whisper(&self, name: String) -> Response {
        Response::text(200, name.to_lowercase())
    }

    pub fn build(greeting: &'static str) -> Self {
        Self { greeting }
    }
}

#[test]
fn test_generated_action_table() {
    let greeter = Greeter::build("hi");
    assert_eq!(greeter.actions(), &["SayHello", "Shout"]);
    assert_eq!(greeter.greeting(), "hi");
    assert_eq!(greeter.whisper("X".into()).data, webdispatch::Payload::Text("x".into()));

    let controller = Arc::new(greeter);
    assert!(Arc::clone(&controller).action("SayHello").is_some());
    assert!(Arc::clone(&controller).action("Whisper").is_none());
    assert!(controller.action("Greeting").is_none());
}

#[test]
fn test_actions_route_and_bind() {
    let controller = Arc::new(Greeter::build("hello"));
    let mut router = Router::new();
    router
        .add_route("/hello/{name}")
        .unwrap()
        .to_method(&controller, "SayHello")
        .unwrap();
    router
        .add_route("/shout/{name}")
        .unwrap()
        .to_method(&controller, "Shout")
        .unwrap();

    let mut dispatcher = webdispatch::Dispatcher::with_router(router);
    dispatcher.clear_formatters();
    dispatcher.add_formatter(
        "text/plain",
        None,
        Some(Arc::new(webdispatch::formatter::TextFormatter)),
    );

    let res = dispatcher.handle(Request::new(http::Method::GET, "/shout/ada"));
    assert_eq!(res.body, b"hello ADA!");
    let res = dispatcher.handle(Request::new(http::Method::GET, "/hello/ada"));
    assert_eq!(res.body, b"hello ada");
}

#[test]
fn test_unknown_action_is_registration_error() {
    let controller = Arc::new(Greeter::build("hi"));
    let mut router = Router::new();
    let err = router
        .add_route("/x")
        .unwrap()
        .to_method(&controller, "say_hello")
        .unwrap_err();
    match err {
        RouteError::UnknownAction { action, .. } => assert_eq!(action, "say_hello"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_rest_routes_need_all_four_verbs() {
    let mut router = Router::new();
    let err = router
        .add_rest_routes("/g/{name}", &Arc::new(Greeter::build("hi")))
        .unwrap_err();
    assert!(matches!(err, RouteError::UnknownAction { .. }));

    let mut router = Router::new();
    router
        .add_rest_routes("/rest/{id}/{test}", &Arc::new(TestController::default()))
        .unwrap();
    let methods: Vec<_> = router.routes().iter().filter_map(|r| r.method()).collect();
    assert_eq!(methods, ["GET", "POST", "PUT", "DELETE"]);
}

#[test]
fn test_sample_controller_actions() {
    let controller = TestController::default();
    assert_eq!(
        controller.actions(),
        &["TestRequest", "TestModel", "Get", "Post", "Put", "Delete"]
    );
}

#[test]
fn test_request_parameter_sees_decoded_body() {
    let controller = Arc::new(TestController::default());
    let mut dispatcher = webdispatch::Dispatcher::new();
    dispatcher
        .router_mut()
        .add_route("/req/")
        .unwrap()
        .to_method(&controller, "TestRequest")
        .unwrap();

    let req = Request::new(http::Method::POST, "/req/")
        .with_header("Content-Type", "application/json")
        .with_body(r#"{"Tester": [1, 2]}"#);
    let res = dispatcher.handle(req);
    assert_eq!(res.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body, json!({"Id": 1, "Tester": [1, 2]}));
    assert_eq!(controller.calls(), 1);
}

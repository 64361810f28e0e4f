use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use webdispatch::{controller, Body, Dispatcher, Request, Response, Router};

#[derive(Debug, Serialize, Deserialize)]
struct Animal {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Tester")]
    tester: Value,
}

struct Zoo;

#[controller]
impl Zoo {
    pub fn get(&self, id: i64, name: String) -> Response {
        Response::json(200, json!({ "Id": id, "Tester": name }))
    }

    pub fn post(&self, animal: Body<Animal>) -> Response {
        Response::with_data(201, &animal.into_inner())
    }

    pub fn put(&self, _id: i64, animal: Body<Animal>) -> Response {
        Response::with_data(202, &animal.into_inner())
    }

    pub fn delete(&self, _id: i64) -> Response {
        Response::new(210)
    }
}

fn zoo_router() -> Router {
    let mut router = Router::new();
    for template in [
        "/",
        "/zoo/animals",
        "/zoo/animals/{id}/toys/{toy_id}",
        "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
        "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
        "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}",
    ] {
        router
            .add_route(template)
            .unwrap()
            .to_request_fn(|_: &Request| Response::new(200));
    }
    router
        .add_rest_routes("/rest/{id}/{name}", &Arc::new(Zoo))
        .unwrap();
    router
}

fn bench_route_throughput(c: &mut Criterion) {
    let router = zoo_router();
    let test_paths = [
        (Method::GET, "/zoo/animals/123/toys/456"),
        (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
        (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
        (Method::DELETE, "/rest/9/rex"),
    ];
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in &test_paths {
                let res = router.route(method.as_str(), path, &[]);
                let _ = black_box(res);
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let dispatcher = Dispatcher::with_router(zoo_router());
    let body = br#"{"Id": 7, "Tester": {"name": "rex", "legs": 4}}"#.to_vec();

    c.bench_function("dispatch_get", |b| {
        b.iter(|| {
            let req = Request::new(Method::GET, "/rest/42/rex");
            black_box(dispatcher.handle(req))
        })
    });

    c.bench_function("dispatch_post_json", |b| {
        b.iter(|| {
            let req = Request::new(Method::POST, "/rest/7/rex")
                .with_header("content-type", "application/json")
                .with_body(body.clone());
            black_box(dispatcher.handle(req))
        })
    });
}

criterion_group!(benches, bench_route_throughput, bench_dispatch);
criterion_main!(benches);

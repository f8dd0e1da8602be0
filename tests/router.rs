mod common;

use common::request;

use request_delegate::http::{Body, Bytes, HttpContext, StatusCode};
use request_delegate::results;
use request_delegate::{
    BindingPlan, BoxResult, BuildError, Declare, Json, Param, RequestDelegate,
    RequestDelegateOptions, Router, Services,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Widget {
    id: i32,
    name: String,
}

struct Inventory {
    names: Vec<&'static str>,
}

fn router() -> Router {
    let inventory = Arc::new(Inventory {
        names: vec!["sprocket", "gear"],
    });

    Router::new()
        .services(Services::new().singleton(inventory))
        .get(
            "/widgets/:id",
            |id: i32, inventory: Arc<Inventory>| -> BoxResult {
                match inventory.names.get(id as usize) {
                    Some(name) => results::json(&Widget {
                        id,
                        name: (*name).to_owned(),
                    }),
                    None => results::not_found(),
                }
            },
            ["id", "inventory"],
        )
        .unwrap()
        .post(
            "/widgets",
            |widget: Json<Widget>| widget,
            ["widget"],
        )
        .unwrap()
        .delete("/widgets/:id", |_: i32| -> Option<BoxResult> { None }, ["id"])
        .unwrap()
}

async fn send(router: &Router, request: http::Request<Body>) -> http::Response<Bytes> {
    router.serve(request).await.unwrap()
}

#[tokio::test]
async fn routes_bind_route_values() {
    let router = router();

    let response = send(&router, request("/widgets/1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<Widget>(response.body()).unwrap(),
        Widget {
            id: 1,
            name: "gear".into()
        }
    );

    let response = send(&router, request("/widgets/9")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&router, request("/widgets/abc")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_values_are_not_read_from_the_query() {
    let router = Router::new()
        .get("/items/:id", |id: i32| id.to_string(), ["id"])
        .unwrap()
        .get("/items", |id: i32| id.to_string(), ["id"])
        .unwrap();

    let response = send(&router, request("/items/3?id=5")).await;
    assert_eq!(&response.body()[..], b"3");

    let response = send(&router, request("/items?id=5")).await;
    assert_eq!(&response.body()[..], b"5");
}

#[tokio::test]
async fn post_body() {
    let router = router();

    let widget = Widget {
        id: 3,
        name: "cog".into(),
    };
    let request = http::Request::builder()
        .method("POST")
        .uri("/widgets")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&widget).unwrap()))
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(
        serde_json::from_slice::<Widget>(response.body()).unwrap(),
        widget
    );
}

#[tokio::test]
async fn not_found() {
    let response = send(&router(), request("/gadgets")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn method_not_allowed() {
    let request = http::Request::builder()
        .method("PUT")
        .uri("/widgets")
        .body(Body::empty())
        .unwrap();

    let response = send(&router(), request).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST, OPTIONS");

    let request = http::Request::builder()
        .method("PUT")
        .uri("/widgets/1")
        .body(Body::empty())
        .unwrap();

    let response = send(&router(), request).await;
    assert_eq!(response.headers()["allow"], "DELETE, GET, OPTIONS");
}

#[tokio::test]
async fn handler_errors_are_server_errors() {
    let request = http::Request::builder()
        .method("DELETE")
        .uri("/widgets/1")
        .body(Body::empty())
        .unwrap();

    let response = send(&router(), request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn aborted_exchanges_have_no_response() {
    let router = Router::new()
        .get(
            "/abort",
            |cx: HttpContext| {
                cx.abort();
                "unsent"
            },
            ["cx"],
        )
        .unwrap();

    assert!(router.serve(request("/abort")).await.is_none());
}

#[tokio::test]
async fn services_are_configured_before_routes() {
    struct Clock;
    impl Declare for Clock {}

    let router = Router::with_options(RequestDelegateOptions::new().body_limit(16))
        .services(Services::new().transient(|| Clock))
        .get("/time", |_: Option<Clock>| "tick", ["clock"])
        .unwrap();

    let response = send(&router, request("/time")).await;
    assert_eq!(&response.body()[..], b"tick");
}

#[test]
fn invalid_routes() {
    let err = Router::new()
        .get("/widgets/:id", |_: i32| (), ["id"])
        .unwrap()
        .get("/widgets/:name", |_: String| (), ["name"])
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::Route(_)));

    let err = Router::new()
        .get("/widgets", |_: i32| (), [Param::new("id").route()])
        .err()
        .unwrap();
    assert!(matches!(
        err,
        BuildError::UnknownRouteParameter { ref key, .. } if key == "id"
    ));
}

#[test]
fn route_parameter_names_come_from_the_pattern() {
    let delegate = RequestDelegate::create(
        |_: i32| (),
        ["id"],
        &RequestDelegateOptions::new().route_parameter_names(["id"]),
    )
    .unwrap();

    assert!(matches!(delegate.bindings()[0], BindingPlan::Route { ref key, .. } if key == "id"));
}

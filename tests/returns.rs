mod common;

use common::{body_text, content_type, get};

use request_delegate::http::{HeaderValue, HttpContext, HttpResponse, StatusCode};
use request_delegate::results::{self, JsonContent};
use request_delegate::{
    BoxResult, Completion, Deferred, Error, Handler, Json, Object, Param, RequestDelegate,
    RequestDelegateOptions, ReturnAdapter,
};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Widget {
    id: i32,
    name: &'static str,
}

const WIDGET: Widget = Widget {
    id: 7,
    name: "sprocket",
};

fn none() -> Vec<Param> {
    Vec::new()
}

async fn serve<H, Args>(handler: H) -> (HttpContext, Result<(), Error>)
where
    H: Handler<Args>,
    Args: 'static,
{
    serve_with(handler, none()).await
}

async fn serve_with<H, Args, P>(
    handler: H,
    params: impl IntoIterator<Item = P>,
) -> (HttpContext, Result<(), Error>)
where
    H: Handler<Args>,
    Args: 'static,
    P: Into<Param>,
{
    let delegate =
        RequestDelegate::create(handler, params, &RequestDelegateOptions::new()).unwrap();
    let cx = get("/");
    let result = delegate.invoke(&cx).await;
    (cx, result)
}

#[tokio::test]
async fn unit_writes_nothing() {
    let (cx, result) = serve(|| ()).await;

    result.unwrap();
    assert_eq!(cx.response().status(), StatusCode::OK);
    assert!(cx.response().body().is_empty());
    assert_eq!(content_type(&cx), None);
}

#[tokio::test]
async fn text() {
    let (cx, result) = serve(|| "hello").await;

    result.unwrap();
    assert_eq!(body_text(&cx), "hello");
    assert_eq!(
        content_type(&cx).as_deref(),
        Some("text/plain; charset=utf-8")
    );

    let (cx, result) = serve(|| String::from("owned")).await;
    result.unwrap();
    assert_eq!(body_text(&cx), "owned");
}

#[tokio::test]
async fn text_keeps_an_existing_content_type() {
    let (cx, result) = serve_with(
        |response: HttpResponse| {
            response.set_content_type(HeaderValue::from_static("text/html"));
            "<p>hello</p>"
        },
        ["response"],
    )
    .await;

    result.unwrap();
    assert_eq!(body_text(&cx), "<p>hello</p>");
    assert_eq!(content_type(&cx).as_deref(), Some("text/html"));
}

#[tokio::test]
async fn json() {
    let (cx, result) = serve(|| Json(WIDGET)).await;

    result.unwrap();
    assert_eq!(body_text(&cx), r#"{"id":7,"name":"sprocket"}"#);
    assert_eq!(
        content_type(&cx).as_deref(),
        Some("application/json; charset=utf-8")
    );
}

#[tokio::test]
async fn results_execute() {
    let (cx, result) = serve(|| results::json(&WIDGET)).await;
    result.unwrap();
    assert_eq!(body_text(&cx), r#"{"id":7,"name":"sprocket"}"#);

    let (cx, result) = serve(|| -> BoxResult {
        Box::new(JsonContent::new(&WIDGET).status(StatusCode::CREATED))
    })
    .await;
    result.unwrap();
    assert_eq!(cx.response().status(), StatusCode::CREATED);

    let (cx, result) = serve(results::no_content).await;
    result.unwrap();
    assert_eq!(cx.response().status(), StatusCode::NO_CONTENT);
    assert!(cx.response().body().is_empty());

    let (cx, result) = serve(|| results::redirect("/widgets/7")).await;
    result.unwrap();
    assert_eq!(cx.response().status(), StatusCode::FOUND);
    assert_eq!(
        cx.response().header("location"),
        Some(HeaderValue::from_static("/widgets/7"))
    );
}

#[tokio::test]
async fn null_result() {
    let (_, result) = serve(|| -> Option<BoxResult> { None }).await;
    assert!(matches!(result, Err(Error::NullResult)));
}

#[tokio::test]
async fn deferred_values() {
    let (cx, result) = serve(|| Deferred::new(async {})).await;
    result.unwrap();
    assert!(cx.response().body().is_empty());

    let (cx, result) = serve(|| Deferred::new(async { String::from("later") })).await;
    result.unwrap();
    assert_eq!(body_text(&cx), "later");
    assert_eq!(
        content_type(&cx).as_deref(),
        Some("text/plain; charset=utf-8")
    );

    let (cx, result) = serve(|| Deferred::ready(Json(WIDGET))).await;
    result.unwrap();
    assert_eq!(body_text(&cx), r#"{"id":7,"name":"sprocket"}"#);
}

#[tokio::test]
async fn pending_text_sets_content_type_before_completing() {
    let (cx, result) = serve_with(
        |response: HttpResponse| {
            Deferred::new(async move {
                response
                    .content_type()
                    .map(|value| value.to_str().unwrap().to_owned())
                    .unwrap_or_default()
            })
        },
        ["response"],
    )
    .await;

    result.unwrap();
    assert_eq!(body_text(&cx), "text/plain; charset=utf-8");
}

#[tokio::test]
async fn ready_and_pending_results_match() {
    let (ready, result) = serve(|| Deferred::ready(results::status(StatusCode::CREATED))).await;
    result.unwrap();

    let (pending, result) =
        serve(|| Deferred::new(async { results::status(StatusCode::CREATED) })).await;
    result.unwrap();

    assert_eq!(ready.response().status(), StatusCode::CREATED);
    assert_eq!(pending.response().status(), StatusCode::CREATED);
    assert_eq!(ready.response().body(), pending.response().body());
}

#[tokio::test]
async fn null_deferred() {
    let (_, result) = serve(|| -> Option<Deferred<String>> { None }).await;
    assert!(matches!(result, Err(Error::NullDeferred)));

    let (_, result) = serve(|| -> Option<Deferred<Object>> { None }).await;
    assert!(matches!(result, Err(Error::NullDeferred)));

    let (_, result) = serve(|| Deferred::new(async { None::<BoxResult> })).await;
    assert!(matches!(result, Err(Error::NullResult)));
}

#[tokio::test]
async fn objects_dispatch_on_their_value() {
    let delegate = RequestDelegate::create(
        |kind: String| match kind.as_str() {
            "null" => Object::Null,
            "text" => Object::from("hello"),
            "json" => Object::json(&WIDGET).unwrap(),
            "result" => Object::from(results::status(StatusCode::ACCEPTED)),
            _ => Object::from(Deferred::new(async { Object::from("later") })),
        },
        ["kind"],
        &RequestDelegateOptions::new(),
    )
    .unwrap();

    assert_eq!(delegate.descriptor().returns(), ReturnAdapter::Object);

    let cx = get("/?kind=null");
    delegate.invoke(&cx).await.unwrap();
    assert_eq!(body_text(&cx), "null");
    assert_eq!(
        content_type(&cx).as_deref(),
        Some("application/json; charset=utf-8")
    );

    let cx = get("/?kind=text");
    delegate.invoke(&cx).await.unwrap();
    assert_eq!(body_text(&cx), "hello");
    assert_eq!(
        content_type(&cx).as_deref(),
        Some("text/plain; charset=utf-8")
    );

    let cx = get("/?kind=json");
    delegate.invoke(&cx).await.unwrap();
    assert_eq!(body_text(&cx), r#"{"id":7,"name":"sprocket"}"#);

    let cx = get("/?kind=result");
    delegate.invoke(&cx).await.unwrap();
    assert_eq!(cx.response().status(), StatusCode::ACCEPTED);

    let cx = get("/?kind=deferred");
    delegate.invoke(&cx).await.unwrap();
    assert_eq!(body_text(&cx), "later");
}

#[tokio::test]
async fn objects_complete_deferred_results_and_text() {
    let (cx, result) = serve(|| {
        Object::from(Deferred::new(async { results::status(StatusCode::CREATED) }))
    })
    .await;
    result.unwrap();
    assert_eq!(cx.response().status(), StatusCode::CREATED);

    let (cx, result) = serve(|| Object::from(Deferred::ready(results::no_content()))).await;
    result.unwrap();
    assert_eq!(cx.response().status(), StatusCode::NO_CONTENT);

    let (_, result) = serve(|| Object::from(Deferred::new(async { None::<BoxResult> }))).await;
    assert!(matches!(result, Err(Error::NullResult)));

    let (cx, result) = serve_with(
        |response: HttpResponse| {
            Object::from(Deferred::new(async move {
                response
                    .content_type()
                    .map(|value| value.to_str().unwrap().to_owned())
                    .unwrap_or_default()
            }))
        },
        ["response"],
    )
    .await;
    result.unwrap();
    assert_eq!(body_text(&cx), "text/plain; charset=utf-8");

    let (cx, result) = serve(|| Object::from(Deferred::ready("ready"))).await;
    result.unwrap();
    assert_eq!(body_text(&cx), "ready");
    assert_eq!(
        content_type(&cx).as_deref(),
        Some("text/plain; charset=utf-8")
    );

    let (cx, result) = serve(|| {
        Deferred::ready(Object::from(Deferred::ready(String::from("inner"))))
    })
    .await;
    assert!(matches!(result, Err(Error::NestedDeferred)));
    assert!(cx.response().body().is_empty());
}

#[tokio::test]
async fn deferred_objects_unwrap_once() {
    let (cx, result) = serve(|| Deferred::new(async { Object::Null })).await;
    result.unwrap();
    assert_eq!(body_text(&cx), "null");

    let (cx, result) = serve(|| {
        Deferred::ready(Object::from(Deferred::ready(Object::from("inner"))))
    })
    .await;
    assert!(matches!(result, Err(Error::NestedDeferred)));
    assert!(cx.response().body().is_empty());
}

#[test]
fn adapters_follow_the_return_type() {
    let adapter = |delegate: RequestDelegate| delegate.descriptor().returns();
    let options = RequestDelegateOptions::new();

    assert_eq!(
        adapter(RequestDelegate::create(|| (), none(), &options).unwrap()),
        ReturnAdapter::Empty
    );
    assert_eq!(
        adapter(RequestDelegate::create(|| "text", none(), &options).unwrap()),
        ReturnAdapter::Text
    );
    assert_eq!(
        adapter(RequestDelegate::create(|| Json(1), none(), &options).unwrap()),
        ReturnAdapter::Json
    );
    assert_eq!(
        adapter(RequestDelegate::create(results::ok, none(), &options).unwrap()),
        ReturnAdapter::Result
    );
    assert_eq!(
        adapter(RequestDelegate::create(|| Deferred::ready(()), none(), &options).unwrap()),
        ReturnAdapter::Deferred(Completion::Empty)
    );
    assert_eq!(
        adapter(
            RequestDelegate::create(|| Deferred::ready(String::new()), none(), &options).unwrap()
        ),
        ReturnAdapter::Deferred(Completion::Text)
    );
    assert_eq!(
        adapter(RequestDelegate::create(|| Deferred::ready(Json(1)), none(), &options).unwrap()),
        ReturnAdapter::Deferred(Completion::Json)
    );
    assert_eq!(
        adapter(
            RequestDelegate::create(|| Deferred::ready(results::ok()), none(), &options).unwrap()
        ),
        ReturnAdapter::Deferred(Completion::Result)
    );
    assert_eq!(
        adapter(
            RequestDelegate::create(|| Deferred::ready(Object::Null), none(), &options).unwrap()
        ),
        ReturnAdapter::Object
    );
}

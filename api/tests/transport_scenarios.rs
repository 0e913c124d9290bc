use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use pollmcp_api::build_router;
use pollmcp_api::config::ServerConfig;
use pollmcp_api::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;

const VERSION: &str = "2025-06-18";

struct TestServer {
    app: Router,
    state: AppState,
}

impl TestServer {
    fn new() -> Self {
        Self::with_config(ServerConfig::for_tests())
    }

    fn with_config(config: ServerConfig) -> Self {
        let state = AppState::new(&config);
        let app = build_router(state.clone(), &config);
        Self { app, state }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).expect("request should build"))
            .await
            .expect("request should succeed");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, headers, value)
    }

    /// Gated call with the correct protocol version plus extra headers.
    async fn call(
        &self,
        method: Method,
        uri: &str,
        extra: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut headers = vec![("MCP-Protocol-Version", VERSION)];
        headers.extend_from_slice(extra);
        self.send(method, uri, &headers, body).await
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("{name} header should be present"))
        .to_str()
        .expect("header should be ASCII")
}

#[tokio::test]
async fn empty_notifications_are_200_but_empty_requests_are_204() {
    let server = TestServer::new();

    let (status, headers, body) = server.call(Method::GET, "/notifications", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert!(headers.get("mcp-group-id").is_none());

    let (status, _, body) = server.call(Method::GET, "/requests", &[], None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn gated_routes_reject_missing_or_wrong_protocol_version() {
    let server = TestServer::new();

    for uri in ["/notifications", "/requests", "/tools", "/resources", "/prompts"] {
        let (status, _, body) = server.send(Method::GET, uri, &[], None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} without header");
        assert_eq!(body["error"], "protocol_version_mismatch");
    }

    let (status, _, body) = server
        .send(Method::GET, "/requests", &[("MCP-Protocol-Version", "2024-11-05")], None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["received"], "2024-11-05");

    // rejected traffic never reaches the queues
    server.state.requests.enqueue_detached(json!({ "method": "ping" }));
    let (status, _, _) = server.send(Method::GET, "/requests", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(server.state.requests.outstanding(), 1);
    let (status, _, _) = server.call(Method::GET, "/requests", &[], None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bootstrap_routes_are_not_gated() {
    let server = TestServer::new();

    let (status, headers, body) = server
        .send(
            Method::POST,
            "/initialize",
            &[],
            Some(json!({
                "protocolVersion": VERSION,
                "clientInfo": { "name": "test-client", "version": "1.0.0" },
                "capabilities": {}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["protocolVersion"], VERSION);
    assert_eq!(body["serverInfo"]["name"], "pollmcp-server");
    assert_eq!(header(&headers, "MCP-Protocol-Version"), VERSION);
    assert!(!header(&headers, "Mcp-Session-Id").is_empty());

    let (status, _, _) = server.send(Method::GET, "/ping", &[], None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _, body) = server.send(Method::GET, "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn scenario_a_notification_group_is_acknowledged_and_gone() {
    let server = TestServer::new();
    let (status, _, body) = server
        .send(
            Method::POST,
            "/internal/notifications",
            &[],
            Some(json!([{ "type": "progress" }])),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], 1);

    let (status, headers, body) = server.call(Method::GET, "/notifications", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "type": "progress" }]));
    let group_id = header(&headers, "Mcp-Group-Id").to_string();

    let (status, _, _) = server
        .call(Method::POST, "/notifications", &[("Mcp-Group-Id", &group_id)], None)
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, headers, body) = server.call(Method::GET, "/notifications", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    assert!(headers.get("mcp-group-id").is_none());

    let (status, _, body) = server
        .call(Method::POST, "/notifications", &[("Mcp-Group-Id", &group_id)], None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_correlation_id");
}

#[tokio::test]
async fn scenario_b_request_is_answered_once() {
    let server = TestServer::new();
    server
        .send(Method::POST, "/internal/requests", &[], Some(json!({ "method": "ping" })))
        .await;

    let (status, headers, body) = server.call(Method::GET, "/requests", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "method": "ping" }));
    assert_eq!(header(&headers, "MCP-Protocol-Version"), VERSION);
    let request_id = header(&headers, "Mcp-Request-Id").to_string();

    let (status, _, _) = server
        .call(Method::POST, "/responses", &[("Mcp-Request-Id", &request_id)], Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _, body) = server
        .call(Method::POST, "/responses", &[("Mcp-Request-Id", &request_id)], Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_correlation_id");

    let (status, _, body) = server.call(Method::POST, "/responses", &[], Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "Mcp-Request-Id");
}

#[tokio::test(start_paused = true)]
async fn scenario_c_unacknowledged_request_is_redelivered_under_a_new_id() {
    let server = TestServer::new();
    server
        .send(Method::POST, "/internal/requests", &[], Some(json!({ "method": "ping" })))
        .await;

    let (_, headers, first_body) = server.call(Method::GET, "/requests", &[], None).await;
    let first_id = header(&headers, "Mcp-Request-Id").to_string();

    let (status, _, _) = server.call(Method::GET, "/requests", &[], None).await;
    assert_eq!(status, StatusCode::NO_CONTENT, "leased request is not handed out twice");

    let (_, _, body) = server.send(Method::POST, "/internal/reactivate", &[], None).await;
    assert_eq!(body["reactivated"], 0, "lease has not expired yet");

    tokio::time::advance(Duration::from_millis(600)).await;
    let (_, _, body) = server.send(Method::POST, "/internal/reactivate", &[], None).await;
    assert_eq!(body["reactivated"], 1);

    let (status, headers, second_body) = server.call(Method::GET, "/requests", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    let second_id = header(&headers, "Mcp-Request-Id").to_string();
    assert_ne!(first_id, second_id);
    assert_eq!(first_body, second_body);

    let (status, _, _) = server
        .call(Method::POST, "/responses", &[("Mcp-Request-Id", &second_id)], Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _, _) = server
        .call(Method::POST, "/responses", &[("Mcp-Request-Id", &first_id)], Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_long_running_tool_is_polled_to_completion() {
    let server = TestServer::with_config(ServerConfig {
        forecast_delay: Duration::from_millis(200),
        ..ServerConfig::for_tests()
    });
    let args = json!({ "arguments": { "location": "Oslo" } });

    let (status, _, body) = server
        .call(Method::POST, "/tools/getWeatherForecast/calls", &[], Some(args.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "Mcp-Request-Id");

    let (status, headers, body) = server
        .call(
            Method::POST,
            "/tools/getWeatherForecast/calls",
            &[("Mcp-Request-Id", "call-42")],
            Some(args.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let location = header(&headers, "Location").to_string();
    assert_eq!(location, "/tools/getWeatherForecast/calls/call-42");
    assert_eq!(body["status"], "processing");

    let (status, _, body) = server
        .call(
            Method::POST,
            "/tools/getWeatherForecast/calls",
            &[("Mcp-Request-Id", "call-42")],
            Some(args),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, headers, _) = server.call(Method::GET, &location, &[], None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(header(&headers, "Location"), location);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, _, body) = server.call(Method::GET, &location, &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isError"], false);
    assert_eq!(body["structuredContent"]["days"].as_array().map(Vec::len), Some(5));

    let (status, _, _) = server.call(Method::GET, &location, &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "results are handed out once");
}

#[tokio::test]
async fn call_ids_with_reserved_url_characters_are_rejected_up_front() {
    let server = TestServer::new();
    let args = json!({ "arguments": { "location": "Oslo" } });

    for id in ["job/1", "a%20b", "q?x=1", "frag#1"] {
        let (status, headers, body) = server
            .call(
                Method::POST,
                "/tools/getWeatherForecast/calls",
                &[("Mcp-Request-Id", id)],
                Some(args.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{id}");
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["field"], "Mcp-Request-Id");
        assert_eq!(body["received"], id);
        assert!(headers.get("location").is_none());
    }
    assert_eq!(server.state.invocations.outstanding(), 0);

    let (status, headers, _) = server
        .call(
            Method::POST,
            "/tools/getWeatherForecast/calls",
            &[("Mcp-Request-Id", "job-1.retry_2~b")],
            Some(args),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let location = header(&headers, "Location").to_string();
    assert_eq!(location, "/tools/getWeatherForecast/calls/job-1.retry_2~b");

    let (status, _, _) = server.call(Method::GET, &location, &[], None).await;
    assert_eq!(status, StatusCode::ACCEPTED, "the returned Location resolves");
    server.state.invocations.abort_all();
}

#[tokio::test]
async fn standard_tools_answer_inline_and_unknown_tools_are_404() {
    let server = TestServer::new();

    let (status, _, body) = server.call(Method::GET, "/tools", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_meta"]["totalTools"], 3);
    let kinds: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|tool| tool["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["standard", "longRunning", "longRunning"]);

    let (status, _, body) = server
        .call(
            Method::POST,
            "/tools/getCurrentWeather/calls",
            &[],
            Some(json!({ "arguments": { "location": "Paris" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"][0]["text"], "Clear skies in Paris");

    let (status, _, body) = server
        .call(Method::POST, "/tools/getCurrentWeather/calls", &[], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isError"], true);

    let (status, _, _) = server
        .call(Method::POST, "/tools/doesNotExist/calls", &[], None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = server
        .call(Method::GET, "/tools/getWeatherForecast/calls/never-started", &[], None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guessing_game_asks_the_client_through_requests() {
    let server = TestServer::new();
    let (status, headers, _) = server
        .call(
            Method::POST,
            "/tools/playGuessingGame/calls",
            &[("Mcp-Request-Id", "game-1")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let location = header(&headers, "Location").to_string();

    let (request_id, request) = loop {
        let (status, headers, body) = server.call(Method::GET, "/requests", &[], None).await;
        if status == StatusCode::OK {
            break (header(&headers, "Mcp-Request-Id").to_string(), body);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(request["method"], "elicitation/create");
    assert_eq!(request["params"]["message"], "Do you want to play a game?");

    let (status, _, _) = server
        .call(
            Method::POST,
            "/responses",
            &[("Mcp-Request-Id", &request_id)],
            Some(json!({ "action": "decline" })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let result = loop {
        let (status, _, body) = server.call(Method::GET, &location, &[], None).await;
        if status == StatusCode::OK {
            break body;
        }
        assert_eq!(status, StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(result["content"][0]["text"], "Maybe next time!");
}

#[tokio::test]
async fn client_cancellation_releases_a_waiting_server_request() {
    let server = TestServer::new();
    let pending = server.state.requests.dispatch(json!({ "method": "roots/list" }));

    let (_, headers, _) = server.call(Method::GET, "/requests", &[], None).await;
    let request_id = header(&headers, "Mcp-Request-Id").to_string();

    let (status, _, _) = server
        .call(
            Method::POST,
            "/notifications",
            &[],
            Some(json!([
                {
                    "method": "notifications/cancelled",
                    "params": { "requestId": request_id, "reason": "user closed dialog" }
                },
                { "method": "notifications/somethingElse" }
            ])),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(pending.await.is_err());

    let (status, _, _) = server
        .call(Method::POST, "/responses", &[("Mcp-Request-Id", &request_id)], Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completions_demo_answers_any_body_and_rejects_a_missing_one() {
    let server = TestServer::new();

    let (status, _, body) = server
        .call(Method::POST, "/completions", &[], Some(json!({ "prompt": "Say hi" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "demo-model");
    assert_eq!(body["choices"][0]["text"], "Hello world");
    assert_eq!(body["usage"]["total_tokens"], 2);
    assert!(!body["id"].as_str().unwrap().is_empty());

    let (status, _, body) = server.call(Method::POST, "/completions", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "body");

    let (status, _, body) = server
        .send(Method::POST, "/completions", &[], Some(json!({ "prompt": "Say hi" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "protocol_version_mismatch");
}

#[tokio::test]
async fn resources_and_prompts_round_out_the_surface() {
    let server = TestServer::new();
    let uri = json!({ "uri": "test://static/resource/1" });

    let (status, _, body) = server.call(Method::GET, "/resources", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["resources"].as_array().unwrap().is_empty());

    let (status, _, body) = server
        .call(Method::POST, "/resources/read", &[], Some(uri.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contents"][0]["uri"], "test://static/resource/1");

    let (status, _, _) = server
        .call(Method::POST, "/resources/read", &[], Some(json!({ "uri": "test://nope" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = server
        .call(Method::POST, "/resources/subscribe", &[], Some(uri.clone()))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _, _) = server
        .call(Method::POST, "/resources/unsubscribe", &[], Some(uri.clone()))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _, _) = server
        .call(Method::POST, "/resources/unsubscribe", &[], Some(uri))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = server.call(Method::GET, "/resources/templates", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resourceTemplates"][0]["uriTemplate"], "test://text/resource/{id}");

    let (status, _, body) = server
        .call(Method::POST, "/prompts/greeting", &[], Some(json!({ "name": "Ada" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"][0]["content"]["text"], "Hello, Ada!");

    let (status, _, _) = server.call(Method::POST, "/prompts/nope", &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn log_level_is_validated_and_stored() {
    let server = TestServer::new();

    let (status, _, body) = server
        .call(Method::POST, "/logLevel", &[], Some(json!({ "level": "DEBUG" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], "debug");

    let (_, _, body) = server.call(Method::GET, "/logLevel", &[], None).await;
    assert_eq!(body["level"], "debug");

    let (status, _, _) = server
        .call(Method::POST, "/logLevel", &[], Some(json!({ "level": "loud" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = server.call(Method::POST, "/logLevel", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn internal_routes_can_be_disabled() {
    let server = TestServer::with_config(ServerConfig {
        enable_internal_routes: false,
        ..ServerConfig::for_tests()
    });
    let (status, _, _) = server
        .send(Method::POST, "/internal/reactivate", &[], None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_lists_the_polling_surface() {
    let server = TestServer::new();
    let (status, _, body) = server.send(Method::GET, "/api-doc/openapi.json", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    for path in [
        "/notifications",
        "/requests",
        "/responses",
        "/tools/{name}/calls/{id}",
        "/completions",
    ] {
        assert!(body["paths"].get(path).is_some(), "{path} should be documented");
    }
    assert!(body["paths"].get("/internal/reactivate").is_none());
}

//! Client against a real in-process server on an ephemeral port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pollmcp_api::build_router;
use pollmcp_api::config::ServerConfig;
use pollmcp_api::state::AppState;
use pollmcp_cli::poller::NOTIFICATION_BUFFER;
use pollmcp_cli::{
    CliError, ClientPoller, DefaultRequestHandler, PollingClient, ServerRequestHandler,
    ToolCallStart,
};
use pollmcp_core::notifications::ServerNotification;
use pollmcp_core::requests::{ElicitAction, ElicitResult, ServerRequest};
use pollmcp_core::tools::ToolKind;
use serde_json::{Map, Value, json};

const POLL: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(10);

async fn spawn_server() -> (PollingClient, AppState) {
    let config = ServerConfig::for_tests();
    let state = AppState::new(&config);
    let app = build_router(state.clone(), &config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    let client = PollingClient::new(&format!("http://{addr}")).expect("valid url");
    (client, state)
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("arguments must be an object"),
    }
}

/// Plays the guessing game by bisecting on the server's hints.
struct Bisector {
    bounds: Mutex<(i64, i64, i64)>,
}

impl Bisector {
    fn new() -> Self {
        Self {
            bounds: Mutex::new((1, 10, 0)),
        }
    }
}

#[async_trait]
impl ServerRequestHandler for Bisector {
    async fn handle(&self, request: ServerRequest) -> Value {
        let ServerRequest::Elicit(params) = request else {
            return json!({});
        };
        let field = params
            .requested_schema
            .properties
            .keys()
            .next()
            .cloned()
            .unwrap();
        let value = match field.as_str() {
            "answer" => json!(true),
            "name" => json!("Ada"),
            _ => {
                let mut bounds = self.bounds.lock().unwrap();
                let (lo, hi, last) = *bounds;
                let (lo, hi) = if params.message.contains("too low") {
                    (last + 1, hi)
                } else if params.message.contains("too high") {
                    (lo, last - 1)
                } else {
                    (lo, hi)
                };
                let guess = (lo + hi) / 2;
                *bounds = (lo, hi, guess);
                json!(guess)
            }
        };
        let mut content = Map::new();
        content.insert(field, value);
        serde_json::to_value(ElicitResult {
            action: ElicitAction::Accept,
            content: Some(content),
        })
        .unwrap()
    }
}

#[tokio::test]
async fn session_and_listing_calls_work_end_to_end() {
    let (client, _state) = spawn_server().await;

    let (init, session_id) = client.initialize("roundtrip-test").await.unwrap();
    assert_eq!(init.protocol_version, "2025-06-18");
    assert!(session_id.is_some());
    client.ping().await.unwrap();

    let tools = client.list_tools().await.unwrap();
    let forecast = tools
        .tools
        .iter()
        .find(|tool| tool.name == "getWeatherForecast")
        .unwrap();
    assert_eq!(forecast.kind, ToolKind::LongRunning);

    let level = client.set_log_level("WARNING").await.unwrap();
    assert_eq!(level.level, "warning");
    assert_eq!(client.get_log_level().await.unwrap().level, "warning");

    let err = client.read_resource("test://missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn empty_surfaces_map_to_none() {
    let (client, _state) = spawn_server().await;
    assert_eq!(client.poll_requests().await.unwrap(), None);
    assert_eq!(client.poll_notifications().await.unwrap(), None);
}

#[tokio::test]
async fn long_running_call_without_poller_polling_is_accepted() {
    let (client, _state) = spawn_server().await;
    let started = client
        .start_tool_call(
            "getWeatherForecast",
            args(json!({ "location": "Oslo" })),
            Some("manual-1"),
        )
        .await
        .unwrap();
    let ToolCallStart::Accepted(accepted) = started else {
        panic!("forecast should be accepted, got {started:?}");
    };
    assert_eq!(accepted.location, "/tools/getWeatherForecast/calls/manual-1");

    let missing_id = client
        .start_tool_call("getWeatherForecast", Map::new(), None)
        .await
        .unwrap_err();
    assert_eq!(missing_id.status(), Some(400));
}

#[tokio::test]
async fn poller_resolves_standard_and_long_running_calls() {
    let (client, _state) = spawn_server().await;
    let (poller, _notifications) = ClientPoller::spawn(
        Arc::new(client),
        Arc::new(DefaultRequestHandler::non_interactive()),
        POLL,
    );

    let inline = poller
        .call_tool(
            "getCurrentWeather",
            args(json!({ "location": "Paris" })),
            false,
        )
        .await
        .unwrap();
    assert_eq!(inline.joined_text(), "Clear skies in Paris");

    let forecast = tokio::time::timeout(
        WAIT,
        poller.call_tool(
            "getWeatherForecast",
            args(json!({ "location": "Oslo" })),
            true,
        ),
    )
    .await
    .expect("forecast should finish")
    .unwrap();
    assert!(!forecast.is_error);
    assert_eq!(poller.outstanding_calls(), 0);

    let unknown = poller
        .call_tool("doesNotExist", Map::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(unknown, CliError::Api { status: 404, .. }));

    poller.shutdown().await;
}

#[tokio::test]
async fn poller_plays_the_guessing_game_through_elicitations() {
    let (client, _state) = spawn_server().await;
    let (poller, _notifications) =
        ClientPoller::spawn(Arc::new(client), Arc::new(Bisector::new()), POLL);

    let result = tokio::time::timeout(
        WAIT,
        poller.call_tool("playGuessingGame", Map::new(), true),
    )
    .await
    .expect("game should finish")
    .unwrap();

    assert!(result.joined_text().starts_with("Congratulations Ada!"));
    let attempts = result.structured_content.unwrap()["attempts"]
        .as_i64()
        .unwrap();
    assert!(attempts <= 4, "bisection needs at most 4 guesses, took {attempts}");

    poller.shutdown().await;
}

#[tokio::test]
async fn default_handler_declines_the_game_when_not_interactive() {
    let (client, _state) = spawn_server().await;
    let (poller, _notifications) = ClientPoller::spawn(
        Arc::new(client),
        Arc::new(DefaultRequestHandler::non_interactive()),
        POLL,
    );

    let result = tokio::time::timeout(
        WAIT,
        poller.call_tool("playGuessingGame", Map::new(), true),
    )
    .await
    .expect("game should finish")
    .unwrap();
    assert_eq!(result.joined_text(), "Maybe next time!");

    poller.shutdown().await;
}

#[tokio::test]
async fn poller_delivers_and_acknowledges_notification_groups() {
    let (client, state) = spawn_server().await;
    let (poller, mut notifications) = ClientPoller::spawn(
        Arc::new(client),
        Arc::new(DefaultRequestHandler::non_interactive()),
        POLL,
    );

    state.notifications.notify(ServerNotification::ToolListChanged);
    state.notifications.enqueue(json!({ "not": "a notification" }));

    let first = tokio::time::timeout(WAIT, notifications.recv())
        .await
        .expect("notification should arrive")
        .unwrap();
    assert_eq!(first, ServerNotification::ToolListChanged);

    tokio::time::timeout(WAIT, async {
        while state.notifications.outstanding_groups() > 0
            || state.notifications.buffered_len() > 0
        {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("group should be acknowledged");

    poller.shutdown().await;
}

#[tokio::test]
async fn undrained_notification_receiver_does_not_stall_the_loop() {
    let (client, state) = spawn_server().await;
    let (poller, notifications) = ClientPoller::spawn(
        Arc::new(client),
        Arc::new(DefaultRequestHandler::non_interactive()),
        POLL,
    );

    for _ in 0..NOTIFICATION_BUFFER + 50 {
        state.notifications.notify(ServerNotification::ToolListChanged);
    }

    tokio::time::timeout(WAIT, async {
        while state.notifications.outstanding_groups() > 0
            || state.notifications.buffered_len() > 0
        {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("oversized group should still be acknowledged");

    let roots = tokio::time::timeout(WAIT, state.requests.request(ServerRequest::ListRoots.into()))
        .await
        .expect("requests are still served")
        .unwrap();
    assert_eq!(roots, json!({ "roots": [] }));
    assert_eq!(notifications.len(), NOTIFICATION_BUFFER);

    poller.shutdown().await;
}

#[tokio::test]
async fn poller_answers_server_requests() {
    let (client, state) = spawn_server().await;
    let (poller, _notifications) = ClientPoller::spawn(
        Arc::new(client),
        Arc::new(DefaultRequestHandler::non_interactive()),
        POLL,
    );

    let roots = tokio::time::timeout(WAIT, state.requests.request(ServerRequest::ListRoots.into()))
        .await
        .expect("client should answer")
        .unwrap();
    assert_eq!(roots, json!({ "roots": [] }));

    let unknown = state
        .requests
        .request(json!({ "method": "custom/thing" }))
        .await
        .unwrap();
    assert_eq!(unknown["isError"], true);

    poller.shutdown().await;
}

#[tokio::test]
async fn shutdown_abandons_outstanding_calls() {
    let config = ServerConfig {
        forecast_delay: Duration::from_secs(60),
        ..ServerConfig::for_tests()
    };
    let state = AppState::new(&config);
    let app = build_router(state.clone(), &config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = PollingClient::new(&format!("http://{addr}")).unwrap();

    let (poller, _notifications) = ClientPoller::spawn(
        Arc::new(client),
        Arc::new(DefaultRequestHandler::non_interactive()),
        POLL,
    );
    let token = poller.cancellation_token();
    let call = poller.call_tool("getWeatherForecast", args(json!({ "location": "Oslo" })), true);
    let cancel_soon = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    };
    let (result, _) = tokio::join!(
        tokio::time::timeout(Duration::from_millis(500), call),
        cancel_soon
    );
    // the loop stops polling, so the call never resolves on its own
    assert!(result.is_err());
    assert_eq!(state.invocations.outstanding(), 1);

    poller.shutdown().await;
}

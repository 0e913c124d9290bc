use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, Utc};
use pollmcp_core::requests::{ElicitParams, ElicitSchema, PrimitiveSchema};
use pollmcp_core::tools::{CallToolResult, Tool, ToolAnnotations, ToolKind, string_object_schema};
use pollmcp_runtime::{RequestCorrelator, ToolError, ToolRegistry};
use rand::Rng;
use serde_json::{Map, Value, json};

pub const CURRENT_WEATHER: &str = "getCurrentWeather";
pub const WEATHER_FORECAST: &str = "getWeatherForecast";
pub const GUESSING_GAME: &str = "playGuessingGame";

const FORECAST_DAYS: u64 = 5;
const MAX_GUESSES: u32 = 10;
const NOT_PLAYING: &str = "Maybe next time!";

pub struct MockToolRegistry {
    requests: Arc<RequestCorrelator>,
    forecast_delay: Duration,
}

impl MockToolRegistry {
    pub fn new(requests: Arc<RequestCorrelator>, forecast_delay: Duration) -> Self {
        Self {
            requests,
            forecast_delay,
        }
    }

    async fn guessing_game(&self) -> Result<CallToolResult, ToolError> {
        let play = self
            .requests
            .elicit(ElicitParams {
                message: "Do you want to play a game?".to_string(),
                requested_schema: ElicitSchema::single(
                    "answer",
                    PrimitiveSchema::Boolean {
                        description: Some("Whether to start the game".to_string()),
                    },
                ),
            })
            .await?;
        if play.accepted_field("answer") != Some(&Value::Bool(true)) {
            return Ok(CallToolResult::text(NOT_PLAYING));
        }

        let name = self
            .requests
            .elicit(ElicitParams {
                message: "What is your name?".to_string(),
                requested_schema: ElicitSchema::single(
                    "name",
                    PrimitiveSchema::String {
                        description: Some("Name of the player".to_string()),
                        min_length: Some(2),
                        max_length: Some(50),
                    },
                ),
            })
            .await?;
        let Some(player) = name.accepted_field("name").and_then(Value::as_str) else {
            return Ok(CallToolResult::text(NOT_PLAYING));
        };
        let player = player.to_string();

        let target: i64 = rand::thread_rng().gen_range(1..=10);
        let mut message = "Guess a number between 1 and 10".to_string();

        for attempt in 1..=MAX_GUESSES {
            let answer = self
                .requests
                .elicit(ElicitParams {
                    message: message.clone(),
                    requested_schema: ElicitSchema::single(
                        "guess",
                        PrimitiveSchema::Integer {
                            description: None,
                            minimum: Some(1),
                            maximum: Some(10),
                        },
                    ),
                })
                .await?;
            let Some(guess) = answer.accepted_field("guess").and_then(parse_guess) else {
                return Ok(CallToolResult::text(NOT_PLAYING));
            };

            message = match guess.cmp(&target) {
                std::cmp::Ordering::Equal => {
                    return Ok(CallToolResult::structured(
                        format!(
                            "Congratulations {player}! You guessed the number {target} in {attempt} attempts!"
                        ),
                        json!({ "player": player, "target": target, "attempts": attempt }),
                    ));
                }
                std::cmp::Ordering::Less => {
                    format!("Your guess is too low! Try again (Attempt #{attempt}):")
                }
                std::cmp::Ordering::Greater => {
                    format!("Your guess is too high! Try again (Attempt #{attempt}):")
                }
            };
        }

        Ok(CallToolResult::text(format!(
            "Out of guesses, {player}! The number was {target}."
        )))
    }

    async fn forecast(&self, arguments: &Map<String, Value>) -> Result<CallToolResult, ToolError> {
        let location = required_str(arguments, "location")?;
        let unit = unit_of(arguments);
        tokio::time::sleep(self.forecast_delay).await;

        let today = Utc::now().date_naive();
        let mut rng = rand::thread_rng();
        let days: Vec<Value> = (1..=FORECAST_DAYS)
            .map(|offset| {
                let date = today
                    .checked_add_days(Days::new(offset))
                    .unwrap_or(today)
                    .to_string();
                let high_c: f64 = rng.gen_range(14.0..28.0);
                let low_c = high_c - rng.gen_range(4.0..10.0);
                json!({
                    "date": date,
                    "high": convert(high_c, unit).round(),
                    "low": convert(low_c, unit).round(),
                    "unit": unit,
                })
            })
            .collect();

        Ok(CallToolResult::structured(
            format!("{FORECAST_DAYS}-day forecast for {location}"),
            json!({ "location": location, "days": days }),
        ))
    }
}

fn parse_guess(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn required_str<'a>(arguments: &'a Map<String, Value>, field: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{field}' must be a non-empty string")))
}

fn unit_of(arguments: &Map<String, Value>) -> &'static str {
    match arguments.get("unit").and_then(Value::as_str) {
        Some("fahrenheit") => "fahrenheit",
        _ => "celsius",
    }
}

fn convert(celsius: f64, unit: &str) -> f64 {
    if unit == "fahrenheit" {
        celsius * 9.0 / 5.0 + 32.0
    } else {
        celsius
    }
}

fn weather_input_schema() -> Value {
    let mut schema = string_object_schema(
        &[
            ("location", "The city and state, e.g. San Francisco, CA"),
            ("unit", "The unit of temperature, either 'celsius' or 'fahrenheit'"),
        ],
        &["location"],
    );
    schema["properties"]["unit"]["enum"] = json!(["celsius", "fahrenheit"]);
    schema
}

#[async_trait]
impl ToolRegistry for MockToolRegistry {
    fn list(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: CURRENT_WEATHER.to_string(),
                title: Some("Get Current Weather".to_string()),
                description: Some("Get the current weather in a given location".to_string()),
                input_schema: weather_input_schema(),
                output_schema: Some(json!({
                    "type": "object",
                    "properties": {
                        "temperature": { "type": "number", "description": "The current temperature" },
                        "unit": { "type": "string" },
                        "description": { "type": "string", "description": "A brief description of the current weather" }
                    },
                    "required": ["temperature", "unit", "description"]
                })),
                annotations: Some(ToolAnnotations {
                    title: Some("Get Current Weather Tool".to_string()),
                    read_only_hint: Some(true),
                    open_world_hint: Some(true),
                }),
                kind: ToolKind::Standard,
            },
            Tool {
                name: WEATHER_FORECAST.to_string(),
                title: Some("Get Weather Forecast".to_string()),
                description: Some(
                    "Get a five-day forecast. Long-running: poll the returned Location for the result."
                        .to_string(),
                ),
                input_schema: weather_input_schema(),
                output_schema: None,
                annotations: Some(ToolAnnotations {
                    title: None,
                    read_only_hint: Some(true),
                    open_world_hint: Some(true),
                }),
                kind: ToolKind::LongRunning,
            },
            Tool {
                name: GUESSING_GAME.to_string(),
                title: Some("Play a Guessing Game".to_string()),
                description: Some(
                    "Guess a number between 1 and 10. Asks the client questions through /requests."
                        .to_string(),
                ),
                input_schema: string_object_schema(&[], &[]),
                output_schema: None,
                annotations: None,
                kind: ToolKind::LongRunning,
            },
        ]
    }

    fn classify(&self, name: &str) -> Option<ToolKind> {
        match name {
            CURRENT_WEATHER => Some(ToolKind::Standard),
            WEATHER_FORECAST | GUESSING_GAME => Some(ToolKind::LongRunning),
            _ => None,
        }
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, ToolError> {
        match name {
            CURRENT_WEATHER => {
                let location = required_str(&arguments, "location")?;
                let unit = unit_of(&arguments);
                let description = format!("Clear skies in {location}");
                Ok(CallToolResult::structured(
                    description.clone(),
                    json!({
                        "temperature": convert(20.0, unit),
                        "unit": unit,
                        "description": description,
                    }),
                ))
            }
            WEATHER_FORECAST => self.forecast(&arguments).await,
            GUESSING_GAME => self.guessing_game().await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (Arc<RequestCorrelator>, MockToolRegistry) {
        let requests = Arc::new(RequestCorrelator::new(
            Duration::from_secs(30),
            Some(Duration::from_secs(30)),
        ));
        let registry = MockToolRegistry::new(requests.clone(), Duration::ZERO);
        (requests, registry)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn current_weather_returns_structured_content() {
        let (_, registry) = registry();
        let result = registry
            .invoke(CURRENT_WEATHER, args(json!({ "location": "Bergen", "unit": "fahrenheit" })))
            .await
            .unwrap();
        assert_eq!(result.joined_text(), "Clear skies in Bergen");
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["temperature"], json!(68.0));
        assert_eq!(structured["unit"], "fahrenheit");
    }

    #[tokio::test]
    async fn current_weather_requires_location() {
        let (_, registry) = registry();
        let err = registry.invoke(CURRENT_WEATHER, Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn forecast_has_five_days() {
        let (_, registry) = registry();
        let result = registry
            .invoke(WEATHER_FORECAST, args(json!({ "location": "Oslo" })))
            .await
            .unwrap();
        assert_eq!(result.structured_content.unwrap()["days"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn listing_classifies_every_tool() {
        let (_, registry) = registry();
        for tool in registry.list() {
            assert_eq!(registry.classify(&tool.name), Some(tool.kind));
        }
        assert_eq!(registry.classify("nope"), None);
    }

    async fn answer_next(requests: &RequestCorrelator, answer: Value) -> Value {
        loop {
            if let Some(claimed) = requests.poll() {
                assert!(requests.resolve(claimed.request_id, answer));
                return claimed.request;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn guessing_game_binary_searches_to_a_win() {
        let (requests, registry) = registry();
        let game = tokio::spawn(async move { registry.invoke(GUESSING_GAME, Map::new()).await });

        answer_next(&requests, json!({ "action": "accept", "content": { "answer": true } })).await;
        let asked = answer_next(
            &requests,
            json!({ "action": "accept", "content": { "name": "Ada" } }),
        )
        .await;
        assert_eq!(asked["params"]["message"], "What is your name?");

        let (mut low, mut high, mut last_guess) = (1i64, 10i64, 0i64);
        while !game.is_finished() {
            let Some(claimed) = requests.poll() else {
                tokio::task::yield_now().await;
                continue;
            };
            let message = claimed.request["params"]["message"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            if message.contains("too low") {
                low = last_guess + 1;
            } else if message.contains("too high") {
                high = last_guess - 1;
            }
            last_guess = (low + high) / 2;
            assert!(requests.resolve(
                claimed.request_id,
                json!({ "action": "accept", "content": { "guess": last_guess } })
            ));
        }
        let result = game.await.unwrap().unwrap();
        assert!(result.joined_text().starts_with("Congratulations Ada!"));
    }

    #[tokio::test]
    async fn declining_to_play_ends_the_game() {
        let (requests, registry) = registry();
        let game = tokio::spawn(async move { registry.invoke(GUESSING_GAME, Map::new()).await });
        answer_next(&requests, json!({ "action": "decline" })).await;
        let result = game.await.unwrap().unwrap();
        assert_eq!(result.joined_text(), NOT_PLAYING);
    }
}

//! Planner adapters — turn an utterance into a reply plus at most one action.
//!
//! `LlmPlanner` talks to any OpenAI-compatible Chat Completions endpoint and
//! asks for a JSON object. `UnavailablePlanner` is the deterministic fallback
//! used when no reasoning service is configured.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::actions::ActionSpec;
use crate::clock::Clock;
use crate::config::Config;
use crate::prompts::planner_system_prompt;
use crate::types::{ActionRequest, Plan};

/// Max chars of an error body kept in messages.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("planner unavailable")]
    Unavailable,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed planner output: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait Planner: Send + Sync {
    /// Never fails; problems come back as a reply-only plan.
    async fn plan(&self, utterance: &str) -> Plan;

    /// Short label for banners and status endpoints.
    fn describe(&self) -> String;
}

/// Echo fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePlanner;

#[async_trait]
impl Planner for UnavailablePlanner {
    async fn plan(&self, utterance: &str) -> Plan {
        Plan::reply_only(format!("(unavailable) {}", utterance))
    }

    fn describe(&self) -> String {
        "unavailable".to_string()
    }
}

pub struct LlmPlanner {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    provider: String,
    specs: Vec<&'static ActionSpec>,
    clock: Arc<dyn Clock>,
}

impl LlmPlanner {
    /// `None` when the config lacks what the planner needs.
    pub fn from_config(
        config: &Config,
        specs: Vec<&'static ActionSpec>,
        clock: Arc<dyn Clock>,
    ) -> Option<Self> {
        if !config.planner_configured() {
            return None;
        }
        let base_url = config.base_url.clone()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .ok()?;
        Some(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            provider: config.provider.clone(),
            specs,
            clock,
        })
    }

    async fn chat_completions(&self, utterance: &str) -> Result<String, PlannerError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let system = planner_system_prompt(&self.specs, self.clock.now());
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": utterance },
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.2,
        });

        debug!(model = %self.model, provider = %self.provider, "chat_completions request");

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let data: serde_json::Value = response.json().await?;
        data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PlannerError::Malformed("response has no message content".into()))
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, utterance: &str) -> Plan {
        let result = match self.chat_completions(utterance).await {
            Ok(content) => parse_plan(&content),
            Err(e) => Err(e),
        };
        match result {
            Ok(plan) => {
                info!(
                    action = plan.action.as_ref().map(|a| a.name.as_str()).unwrap_or("none"),
                    "planned"
                );
                plan
            }
            Err(e) => {
                warn!("Planner failed: {}", e);
                Plan::reply_only(format!("planner error: {}", e))
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.model, self.provider)
    }
}

#[derive(Deserialize)]
struct RawPlan {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    action: Option<ActionRequest>,
}

/// Parse the model's JSON object. Code fences around the object are tolerated.
pub fn parse_plan(content: &str) -> Result<Plan, PlannerError> {
    let trimmed = strip_code_fence(content.trim());
    let raw: RawPlan =
        serde_json::from_str(trimmed).map_err(|e| PlannerError::Malformed(e.to_string()))?;

    let action = match raw.action {
        Some(a) if a.name.trim().is_empty() => {
            return Err(PlannerError::Malformed("action name is empty".into()));
        }
        Some(a) => Some(ActionRequest {
            name: a.name.trim().to_string(),
            args: a.args,
        }),
        None => None,
    };

    Ok(Plan {
        reply: raw.reply.unwrap_or_default(),
        action,
    })
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}

/// The LLM planner when configured, otherwise the echo fallback.
pub fn planner_from_config(
    config: &Config,
    specs: Vec<&'static ActionSpec>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn Planner> {
    match LlmPlanner::from_config(config, specs, clock) {
        Some(p) => Arc::new(p),
        None => {
            info!("Planner not configured; replies will echo");
            Arc::new(UnavailablePlanner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[test]
    fn test_parse_plan_with_action() {
        let plan = parse_plan(
            r#"{"reply":"Opening it","action":{"name":"open_url","args":{"url":"https://example.com"}}}"#,
        )
        .unwrap();
        assert_eq!(plan.reply, "Opening it");
        let action = plan.action.unwrap();
        assert_eq!(action.name, "open_url");
        assert_eq!(action.args["url"], "https://example.com");
    }

    #[test]
    fn test_parse_plan_defaults() {
        let plan = parse_plan(r#"{"action":{"name":"system_stats"}}"#).unwrap();
        assert_eq!(plan.reply, "");
        assert!(plan.action.unwrap().args.is_empty());

        let plan = parse_plan(r#"{"reply":"hi","action":null}"#).unwrap();
        assert_eq!(plan, Plan::reply_only("hi"));
    }

    #[test]
    fn test_parse_plan_code_fence() {
        let plan = parse_plan("```json\n{\"reply\":\"ok\"}\n```").unwrap();
        assert_eq!(plan.reply, "ok");
    }

    #[test]
    fn test_parse_plan_malformed() {
        assert!(matches!(parse_plan("sure thing!"), Err(PlannerError::Malformed(_))));
        assert!(matches!(
            parse_plan(r#"{"reply":"x","action":{"name":"  "}}"#),
            Err(PlannerError::Malformed(_))
        ));
        assert!(parse_plan(r#"{"reply":"x","action":"open_url"}"#).is_err());
    }

    #[tokio::test]
    async fn test_unavailable_planner_echoes() {
        let plan = UnavailablePlanner.plan("hello").await;
        assert_eq!(plan.reply, "(unavailable) hello");
        assert!(plan.action.is_none());
    }

    #[test]
    fn test_planner_from_config_falls_back() {
        let config = Config {
            planner_enabled: false,
            ..Config::default()
        };
        let planner = planner_from_config(&config, Vec::new(), Arc::new(SystemClock));
        assert_eq!(planner.describe(), "unavailable");
    }

    fn planner_for(base_url: String, api_key: Option<&str>) -> LlmPlanner {
        let config = Config {
            provider: "custom".into(),
            base_url: Some(base_url),
            api_key: api_key.map(str::to_string),
            ..Config::default()
        };
        LlmPlanner::from_config(&config, Vec::new(), Arc::new(SystemClock)).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({"choices": [{"message": {"content": content}}]})
    }

    #[tokio::test]
    async fn test_llm_planner_parses_completion() {
        let server = wiremock::MockServer::start().await;
        let content = r#"{"reply":"Done","action":{"name":"system_stats","args":{}}}"#;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer sk-test"))
            .and(wiremock::matchers::body_partial_json(json!({
                "response_format": {"type": "json_object"}
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(completion(content)))
            .expect(1)
            .mount(&server)
            .await;

        let plan = planner_for(server.uri(), Some("sk-test"))
            .plan("how busy is my machine")
            .await;
        assert_eq!(plan.reply, "Done");
        assert_eq!(plan.action.unwrap().name, "system_stats");
    }

    #[tokio::test]
    async fn test_llm_planner_sends_utterance_as_user_message() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(completion(r#"{"reply":"ok"}"#)),
            )
            .mount(&server)
            .await;

        let plan = planner_for(server.uri(), None).plan("remind me").await;
        assert_eq!(plan.reply, "ok");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages.last().unwrap()["role"], "user");
        assert_eq!(messages.last().unwrap()["content"], "remind me");
    }

    #[tokio::test]
    async fn test_llm_planner_malformed_content_is_reply_only() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(completion("not json")))
            .mount(&server)
            .await;

        let plan = planner_for(server.uri(), None).plan("hi").await;
        assert!(plan.reply.starts_with("planner error: malformed planner output"));
        assert!(plan.action.is_none());
    }

    #[tokio::test]
    async fn test_llm_planner_http_error_is_reply_only() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(500).set_body_string("{\"error\":\"boom\"}"))
            .mount(&server)
            .await;

        let plan = planner_for(server.uri(), None).plan("hi").await;
        assert!(plan.reply.starts_with("planner error: HTTP 500"));
        assert!(plan.action.is_none());
    }
}

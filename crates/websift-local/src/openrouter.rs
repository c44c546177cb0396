use crate::config::Config;
use crate::prompt::{search_prompt, today_utc};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use websift_core::{Error, Result, SearchGateway, SearchOutcome, SearchRequest, SearchResult};

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    config: Config,
}

impl OpenRouterClient {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("websift/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::NotConfigured(format!("http client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    /// Run one search. Never fails: transport and decoding errors come back as a failure outcome.
    pub async fn search_web(&self, req: &SearchRequest) -> SearchOutcome {
        tracing::info!(
            query_chars = req.query().chars().count(),
            num_results = req.num_results(),
            focus = %req.focus(),
            "openrouter search"
        );
        let t0 = Instant::now();
        let body = build_request(req, &self.config.model, today_utc());
        match self.chat_completions(&body).await {
            Ok(resp) => {
                let outcome = normalize(&resp);
                tracing::debug!(
                    results = outcome.results().len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "openrouter search ok"
                );
                outcome
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "openrouter search error"
                );
                SearchOutcome::from(e)
            }
        }
    }

    pub async fn chat_completions(
        &self,
        req: &ChatCompletionsRequest,
    ) -> Result<ChatCompletionsResponse> {
        let resp = self
            .client
            .post(self.config.endpoint_chat_completions())
            .timeout(self.config.timeout)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key()),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Upstream(upstream_error_message(&bytes).unwrap_or_else(
                || format!("openrouter chat.completions HTTP {status}"),
            )));
        }

        let parsed: ChatCompletionsResponse = serde_json::from_slice(&bytes).map_err(|e| {
            Error::Upstream(format!("openrouter chat.completions: invalid JSON body: {e}"))
        })?;
        // OpenRouter can report provider failures inside a 200 body. An empty `choices` list is
        // still a (resultless) answer.
        if parsed.choices.is_none() {
            if let Some(msg) = parsed.error.as_ref().and_then(error_message) {
                return Err(Error::Upstream(msg));
            }
        }
        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl SearchGateway for OpenRouterClient {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn search(&self, req: &SearchRequest) -> SearchOutcome {
        self.search_web(req).await
    }
}

/// Build the upstream body for one search. Pure given `date`.
pub fn build_request(req: &SearchRequest, model: &str, date: NaiveDate) -> ChatCompletionsRequest {
    ChatCompletionsRequest {
        model: model.to_string(),
        messages: vec![Message {
            role: "user".to_string(),
            content: req.query().to_string(),
        }],
        plugins: vec![Plugin {
            id: "web".to_string(),
            max_results: req.num_results(),
            search_prompt: search_prompt(req.focus(), date),
        }],
    }
}

/// Map the first choice's `url_citation` annotations to results, preserving order.
pub fn normalize(resp: &ChatCompletionsResponse) -> SearchOutcome {
    SearchOutcome::success(citations(resp))
}

/// Annotations are heterogeneous: anything that is not a `url_citation` object with a string
/// `url` is skipped rather than failing the response.
pub fn citations(resp: &ChatCompletionsResponse) -> Vec<SearchResult> {
    let annotations = resp
        .choices
        .as_deref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.as_ref())
        .and_then(|m| m.annotations.as_deref())
        .unwrap_or_default();

    annotations.iter().filter_map(url_citation).collect()
}

fn url_citation(annotation: &serde_json::Value) -> Option<SearchResult> {
    if annotation.get("type")?.as_str()? != "url_citation" {
        return None;
    }
    let c = annotation.get("url_citation")?;
    let url = c.get("url")?.as_str()?;
    let text = |k: &str| {
        c.get(k)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    Some(SearchResult {
        title: text("title"),
        url: url.to_string(),
        content: text("content"),
        domain: extract_domain(url),
    })
}

/// Hostname of `url`, or `url` itself when it does not parse as an absolute URL.
pub fn extract_domain(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(u) => u.host_str().unwrap_or_default().to_string(),
        Err(_) => url.to_string(),
    }
}

fn error_message(err: &serde_json::Value) -> Option<String> {
    err.get("message")
        .and_then(|m| m.as_str())
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

fn upstream_error_message(body: &[u8]) -> Option<String> {
    let v: serde_json::Value = serde_json::from_slice(body).ok()?;
    error_message(v.get("error")?)
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionsRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Plugin {
    pub id: String,
    pub max_results: u8,
    pub search_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletionsResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Kept untyped; see [`citations`].
    #[serde(default)]
    pub annotations: Option<Vec<serde_json::Value>>,
}

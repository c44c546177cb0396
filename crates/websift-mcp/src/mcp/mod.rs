use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, ErrorCode, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use std::sync::Arc;
use tracing::{info, warn};
use websift_core::{validate_search_args, SearchGateway};
use websift_local::{Config, OpenRouterClient};

mod envelope;
use envelope::*;

pub(crate) const SEARCH_WEB: &str = "search_web";

#[derive(Clone)]
pub(crate) struct WebsiftMcp {
    gateway: Arc<dyn SearchGateway>,
}

impl WebsiftMcp {
    pub(crate) fn new(gateway: Arc<dyn SearchGateway>) -> Self {
        Self { gateway }
    }

    pub(crate) fn tools() -> Vec<Tool> {
        vec![Tool::new(
            SEARCH_WEB,
            "Search the web using OpenRouter and return relevant results",
            Arc::new(search_web_schema()),
        )]
    }

    /// Validation failures never reach the gateway.
    pub(crate) async fn search_web(
        &self,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let input = arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);
        let req = match validate_search_args(&input) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "search_web: invalid parameters");
                return Ok(invalid_params_result(&e));
            }
        };
        let outcome = self.gateway.search(&req).await;
        if let Some(err) = outcome.error() {
            warn!(gateway = self.gateway.name(), error = err, "search_web failed");
        }
        outcome_result(&outcome)
    }
}

impl ServerHandler for WebsiftMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Web search via OpenRouter's web plugin. search_web returns cited sources as JSON: {success, results[{title,url,content,domain}], total_results | error}."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "websift".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        match request.name.as_ref() {
            SEARCH_WEB => self.search_web(request.arguments).await,
            other => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {other}"),
                None,
            )),
        }
    }
}

/// Serve until the client closes stdio or an interrupt arrives.
pub(crate) async fn serve_stdio(config: Config) -> anyhow::Result<()> {
    let gateway = OpenRouterClient::new(config)?;
    let svc = WebsiftMcp::new(Arc::new(gateway));
    let running = svc
        .serve(stdio())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    info!("websift MCP server running on stdio");

    let ct = running.cancellation_token();
    let on_interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, closing transport");
            ct.cancel();
        }
    });

    let reason = running.waiting().await?;
    on_interrupt.abort();
    info!(?reason, "websift MCP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use websift_core::{Focus, SearchOutcome, SearchRequest, SearchResult};

    struct FakeGateway {
        calls: AtomicUsize,
        seen: Mutex<Vec<SearchRequest>>,
        outcome: SearchOutcome,
    }

    impl FakeGateway {
        fn returning(outcome: SearchOutcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                outcome,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SearchGateway for FakeGateway {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search(&self, req: &SearchRequest) -> SearchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(req.clone());
            self.outcome.clone()
        }
    }

    fn args(v: serde_json::Value) -> Option<JsonObject> {
        v.as_object().cloned()
    }

    fn text(r: &CallToolResult) -> String {
        r.content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    fn sample() -> SearchOutcome {
        SearchOutcome::success(vec![SearchResult {
            title: "Tokio".to_string(),
            url: "https://tokio.rs/".to_string(),
            content: "An asynchronous runtime".to_string(),
            domain: "tokio.rs".to_string(),
        }])
    }

    #[test]
    fn lists_a_single_search_web_tool() {
        let tools = WebsiftMcp::tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, SEARCH_WEB);
        let schema = serde_json::Value::Object((*tools[0].input_schema).clone());
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["num_results"]["minimum"], json!(1));
        assert_eq!(schema["properties"]["num_results"]["maximum"], json!(10));
        assert_eq!(
            schema["properties"]["focus"]["enum"],
            json!(["technical", "development", "general"])
        );
    }

    #[tokio::test]
    async fn empty_query_is_rejected_without_calling_gateway() {
        let gw = FakeGateway::returning(sample());
        let svc = WebsiftMcp::new(gw.clone());
        let r = svc.search_web(args(json!({"query": ""}))).await.unwrap();
        assert_eq!(r.is_error, Some(true));
        assert!(text(&r).starts_with("Invalid parameters: query"), "{}", text(&r));
        assert_eq!(gw.calls(), 0);
    }

    #[tokio::test]
    async fn missing_arguments_are_rejected() {
        let gw = FakeGateway::returning(sample());
        let svc = WebsiftMcp::new(gw.clone());
        let r = svc.search_web(None).await.unwrap();
        assert_eq!(r.is_error, Some(true));
        assert_eq!(gw.calls(), 0);
    }

    #[tokio::test]
    async fn num_results_boundaries_at_the_tool_surface() {
        let gw = FakeGateway::returning(sample());
        let svc = WebsiftMcp::new(gw.clone());
        for bad in [0, 11] {
            let r = svc
                .search_web(args(json!({"query": "q", "num_results": bad})))
                .await
                .unwrap();
            assert_eq!(r.is_error, Some(true), "num_results={bad}");
        }
        assert_eq!(gw.calls(), 0);
        for ok in [1, 10] {
            let r = svc
                .search_web(args(json!({"query": "q", "num_results": ok})))
                .await
                .unwrap();
            assert_eq!(r.is_error, Some(false), "num_results={ok}");
        }
        let seen = gw.seen.lock().unwrap();
        let ns: Vec<u8> = seen.iter().map(|r| r.num_results()).collect();
        assert_eq!(ns, vec![1, 10]);
    }

    #[tokio::test]
    async fn defaults_reach_the_gateway() {
        let gw = FakeGateway::returning(sample());
        let svc = WebsiftMcp::new(gw.clone());
        svc.search_web(args(json!({"query": "axum extractors"})))
            .await
            .unwrap();
        let seen = gw.seen.lock().unwrap();
        assert_eq!(seen[0].query(), "axum extractors");
        assert_eq!(seen[0].num_results(), 5);
        assert_eq!(seen[0].focus(), Focus::Technical);
    }

    #[tokio::test]
    async fn success_outcome_is_pretty_json_text() {
        let svc = WebsiftMcp::new(FakeGateway::returning(sample()));
        let r = svc
            .search_web(args(json!({"query": "tokio", "focus": "general"})))
            .await
            .unwrap();
        assert_eq!(r.is_error, Some(false));
        let t = text(&r);
        assert!(t.contains('\n'), "expected pretty-printed JSON: {t}");
        let v: serde_json::Value = serde_json::from_str(&t).unwrap();
        assert_eq!(v, serde_json::to_value(sample()).unwrap());
    }

    #[tokio::test]
    async fn failure_outcome_keeps_shape_and_sets_is_error() {
        let svc = WebsiftMcp::new(FakeGateway::returning(SearchOutcome::failure(
            "error sending request",
        )));
        let r = svc.search_web(args(json!({"query": "q"}))).await.unwrap();
        assert_eq!(r.is_error, Some(true));
        let v: serde_json::Value = serde_json::from_str(&text(&r)).unwrap();
        assert_eq!(
            v,
            json!({"success": false, "results": [], "error": "error sending request"})
        );
    }

    #[tokio::test]
    async fn concurrent_calls_are_independent() {
        let gw = FakeGateway::returning(sample());
        let svc = WebsiftMcp::new(gw.clone());
        let (a, b) = tokio::join!(
            svc.search_web(args(json!({"query": "a", "num_results": 2}))),
            svc.search_web(args(json!({"query": "b", "num_results": 3}))),
        );
        assert_eq!(a.unwrap().is_error, Some(false));
        assert_eq!(b.unwrap().is_error, Some(false));
        assert_eq!(gw.calls(), 2);
    }
}

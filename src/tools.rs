//! Tool trait, registry and the built-in site tools.
//!
//! Tools are what the HTTP server exposes to calling agents: each one has a
//! name, a description, a JSON Schema for its parameters and an async
//! [`execute`](Tool::execute). The built-ins wrap the [`App`] operations:
//!
//! | Tool | Parameters | Result |
//! |------|------------|--------|
//! | `crawl_site` | `base_url`, `max_pages?`, `exclude_urls?` | summary text + crawl report |
//! | `ask_site` | `question`, `top_k?` | formatted answer + ranked hits |
//! | `scrape_url` | `url` | extracted page text |
//!
//! Custom tools implement [`Tool`] and are added with
//! [`ToolRegistry::register`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::{format_crawl_summary, App};
use crate::query::format_answer;

/// A tool that agents can discover via `GET /tools/list` and call via
/// `POST /tools/{name}`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name, a lowercase identifier with underscores.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Whether this is one of the built-in tools. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema (`type: "object"`) describing the parameters.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` has already passed [`validate_params`]; the
    /// returned value is wrapped in `{ "result": ... }` by the server.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// What a tool can reach while executing.
pub struct ToolContext {
    app: Arc<App>,
}

impl ToolContext {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}

/// Serializable tool info for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    /// JSON Schema of the parameters.
    pub parameters: Value,
}

impl ToolInfo {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

pub struct CrawlSiteTool;

#[async_trait]
impl Tool for CrawlSiteTool {
    fn name(&self) -> &str {
        "crawl_site"
    }

    fn description(&self) -> &str {
        "Crawl a website breadth-first from base_url and index its pages for ask_site"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "base_url": { "type": "string", "description": "Homepage URL of the site to crawl" },
                "max_pages": { "type": "integer", "description": "Maximum number of pages to visit" },
                "exclude_urls": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Substrings; URLs containing any of them are skipped"
                }
            },
            "required": ["base_url"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let base_url = params["base_url"].as_str().unwrap_or("");
        if base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }

        let max_pages = match params.get("max_pages").and_then(Value::as_i64) {
            Some(n) if n < 1 => bail!("invalid max_pages: must be >= 1"),
            Some(n) => Some(n as usize),
            None => None,
        };

        let exclude: Vec<String> = params
            .get("exclude_urls")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let report = ctx.app().crawl(base_url, max_pages, &exclude).await;
        Ok(json!({
            "summary": format_crawl_summary(&report),
            "report": report,
        }))
    }
}

pub struct AskSiteTool;

#[async_trait]
impl Tool for AskSiteTool {
    fn name(&self) -> &str {
        "ask_site"
    }

    fn description(&self) -> &str {
        "Answer a question from pages indexed by crawl_site"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "Natural-language question" },
                "top_k": { "type": "integer", "description": "Number of results" }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let question = params["question"].as_str().unwrap_or("");
        if question.trim().is_empty() {
            bail!("question must not be empty");
        }
        let top_k = match params.get("top_k").and_then(Value::as_i64) {
            Some(k) if k < 1 => bail!("invalid top_k: must be >= 1"),
            Some(k) => Some(k as usize),
            None => None,
        };

        let outcome = ctx.app().ask(question, top_k).await;
        Ok(json!({
            "answer": format_answer(&outcome),
            "results": outcome.hits,
            "error": outcome.error,
        }))
    }
}

pub struct ScrapeUrlTool;

#[async_trait]
impl Tool for ScrapeUrlTool {
    fn name(&self) -> &str {
        "scrape_url"
    }

    fn description(&self) -> &str {
        "Fetch one web page and return its readable text"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Page URL" }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let url = params["url"].as_str().unwrap_or("");
        if url.trim().is_empty() {
            bail!("url must not be empty");
        }
        Ok(json!({ "text": ctx.app().scrape_url(url).await }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// A registry holding `crawl_site`, `ask_site` and `scrape_url`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CrawlSiteTool));
        registry.register(Box::new(AskSiteTool));
        registry.register(Box::new(ScrapeUrlTool));
        registry
    }

    /// Register a tool. A later tool with an existing name is shadowed by
    /// the earlier one.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `params` against a tool's schema: required fields and JSON types,
/// including the item type of arrays. A `null` body counts as `{}`.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be a JSON object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for field in &required {
        if !params_obj.contains_key(*field) {
            bail!("missing required parameter: {}", field);
        }
    }

    for (name, prop_schema) in &properties {
        let Some(value) = params_obj.get(name) else {
            continue;
        };

        if let Some(expected) = prop_schema.get("type").and_then(|t| t.as_str()) {
            if !type_matches(expected, value) {
                bail!(
                    "parameter '{}' must be of type '{}', got {}",
                    name,
                    expected,
                    json_type_name(value)
                );
            }
            if expected == "array" {
                if let Some(item_type) = prop_schema
                    .get("items")
                    .and_then(|i| i.get("type"))
                    .and_then(|t| t.as_str())
                {
                    let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                    if let Some(bad) = items.iter().find(|v| !type_matches(item_type, v)) {
                        bail!(
                            "parameter '{}' must contain only '{}' items, got {}",
                            name,
                            item_type,
                            json_type_name(bad)
                        );
                    }
                }
            }
        }
    }

    Ok(Value::Object(params_obj))
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

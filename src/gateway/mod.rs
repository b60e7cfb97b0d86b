//! Request Gateway
//!
//! `POST /generate` JSON endpoint, the interactive form at `/`, and a health check.

pub mod form;
pub mod http;

use crate::artifact::{GenerationRequest, GenerationResponse, Target};
use crate::config::Settings;
use crate::db::{lazy_pool, PgColumnSource};
use crate::error::Result;
use crate::generator::PipelineGenerator;
use crate::llm::LlmClient;
use crate::schema_context::{build_context, ColumnSource, NoColumns};
use crate::templates::TemplateStore;
use form::{parse_form_body, parse_schema_text, pick_code, render_form, FormView};
use http::{read_request, write_response, HttpRequest, HttpResponse, ReadOutcome};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

/// Shared, read-only state of a running gateway.
pub struct AppState {
    pub generator: PipelineGenerator,
    pub columns: Arc<dyn ColumnSource>,
    pub templates: TemplateStore,
    pub s3_prefix: String,
    pub default_target: Target,
}

impl AppState {
    /// Wire the model client, schema source and templates from configuration.
    ///
    /// A configured but unreachable database is not an error; lookups just find no columns.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let llm = LlmClient::new(
            settings.api_key()?.to_string(),
            settings.openai_model.clone(),
            settings.openai_base_url.clone(),
        );
        if llm.is_offline() {
            warn!("Dummy OpenAI API key configured - returning canned LLM output");
        }

        let columns: Arc<dyn ColumnSource> = match settings.database_url() {
            Some(url) => {
                info!("Schema introspection enabled against {}:{}", settings.pg_host, settings.pg_port);
                Arc::new(PgColumnSource::new(lazy_pool(&url)?))
            }
            None => {
                info!("PG_DB not set - schema introspection disabled");
                Arc::new(NoColumns)
            }
        };

        let templates = match &settings.templates_dir {
            Some(dir) => TemplateStore::load_dir(dir)?,
            None => TemplateStore::builtin(),
        };

        Ok(Self {
            generator: PipelineGenerator::new(Arc::new(llm)),
            columns,
            templates,
            s3_prefix: settings.s3_sales_prefix.clone(),
            default_target: settings.default_target,
        })
    }

    /// Context -> model artifact -> guardrail templates, for one request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        request.validate()?;
        let target = request.target_or(self.default_target);

        let context = build_context(request.schema_hint.as_ref(), self.columns.as_ref()).await;
        let llm_outputs = self
            .generator
            .generate(&request.user_request, &context, target)
            .await?;
        let templates = self.templates.render_all(&self.s3_prefix);

        Ok(GenerationResponse {
            llm_outputs,
            templates,
        })
    }
}

pub async fn route(state: &AppState, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/health") => HttpResponse::json(
            200,
            r#"{"status":"ok","service":"pipeline-builder"}"#,
        ),
        ("POST", "/generate") => handle_generate(state, &request.body).await,
        ("GET", "/") => HttpResponse::html(200, render_form(&FormView::initial(state.default_target))),
        ("POST", "/") => handle_form(state, &request.body).await,
        ("OPTIONS", _) => HttpResponse::json(200, ""),
        (method, path) => {
            warn!("404: {} {} not found", method, path);
            HttpResponse::error(404, &format!("Endpoint not found: {} {}", method, path))
        }
    }
}

async fn handle_generate(state: &AppState, body: &str) -> HttpResponse {
    let request: GenerationRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => return HttpResponse::error(400, &format!("Invalid request body: {}", e)),
    };

    match state.generate(&request).await {
        Ok(response) => match serde_json::to_string(&response) {
            Ok(json) => HttpResponse::json(200, json),
            Err(e) => HttpResponse::error(500, &format!("Failed to serialize response: {}", e)),
        },
        Err(e) => {
            error!("LLM generation failed: {}", e);
            HttpResponse::error(200, &e.to_string())
        }
    }
}

async fn handle_form(state: &AppState, body: &str) -> HttpResponse {
    let fields = parse_form_body(body);
    let mut view = FormView::initial(state.default_target);
    if let Some(text) = fields.get("user_request") {
        view.user_request = text.clone();
    }
    if let Some(text) = fields.get("schema") {
        view.schema_text = text.clone();
    }

    let target = match fields.get("target").map(|t| t.parse::<Target>()) {
        Some(Ok(target)) => target,
        Some(Err(e)) => {
            view.error = Some(e.to_string());
            return HttpResponse::html(200, render_form(&view));
        }
        None => state.default_target,
    };
    view.target = target;

    let request = GenerationRequest::new(view.user_request.clone(), target)
        .with_schema_hint(parse_schema_text(&view.schema_text));

    match state.generate(&request).await {
        Ok(response) => {
            view.code = pick_code(Some(&response.llm_outputs), Some(&response.templates), target);
            view.explanation = response
                .llm_outputs
                .explanation()
                .filter(|e| !e.is_empty())
                .map(str::to_string);
        }
        Err(e) => {
            error!("Form generation failed: {}", e);
            view.error = Some(e.to_string());
        }
    }

    HttpResponse::html(200, render_form(&view))
}

async fn handle_connection(state: Arc<AppState>, mut stream: TcpStream) {
    let response = match read_request(&mut stream).await {
        Ok(ReadOutcome::Request(request)) => route(&state, &request).await,
        Ok(ReadOutcome::TooLarge) => HttpResponse::error(413, "Request too large"),
        Ok(ReadOutcome::Invalid) => HttpResponse::error(400, "Bad Request"),
        Ok(ReadOutcome::Closed) => return,
        Err(e) => {
            warn!("Failed to read from stream: {}", e);
            return;
        }
    };
    write_response(&mut stream, &response).await;
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    info!("Gateway listening on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("New connection from: {}", addr);
        tokio::spawn(handle_connection(state.clone(), stream));
    }
}

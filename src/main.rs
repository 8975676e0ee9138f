use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::{get, post}, Router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use taggernews::config::Config;
use taggernews::hn_client::HnClient;
use taggernews::llm::OpenAiOracle;
use taggernews::scheduler::Scheduler;
use taggernews::{db, handlers, middleware, models, AppState};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::stories::list_stories,
        handlers::stories::get_story,
        handlers::stories::refresh_stories,
        handlers::stories::advanced_filter,
        handlers::tags::grouped_tags,
        handlers::agent::list_runs,
        handlers::agent::get_run,
        handlers::agent::list_proposals,
        handlers::agent::get_proposal,
        handlers::agent::approve_proposal,
        handlers::agent::reject_proposal,
        handlers::agent::execute_proposal,
        handlers::agent::trigger_run,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::StoryResponse,
            handlers::stories::AdvancedFilterResponse,
            models::GroupedTags,
            models::AgentRun,
            models::TagProposal,
            models::ProposalData,
        )
    ),
    tags(
        (name = "Stories", description = "Story query endpoints"),
        (name = "Tags", description = "Taxonomy introspection"),
        (name = "Agent", description = "Taxonomy-maintenance agent (non-production only)"),
        (name = "System", description = "Health and readiness"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "api_key",
            utoipa::openapi::security::SecurityScheme::ApiKey(utoipa::openapi::security::ApiKey::Header(
                utoipa::openapi::security::ApiKeyValue::new("X-API-Key"),
            )),
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("taggernews.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("taggernews starting up");

    let pool = db::create_pool(&config.database.url).await?;
    tracing::info!("database pool created");

    let hn_client = HnClient::new(
        config.upstream.hn_api_base_url.clone(),
        config.upstream.max_concurrent_requests,
        config.upstream.request_timeout_secs,
    );

    let oracle: Arc<dyn taggernews::Oracle> = Arc::new(OpenAiOracle::new(
        config.enrichment.openai_api_key.clone().unwrap_or_default(),
        config.enrichment.summarization_model.clone(),
    ));

    let scheduler = Scheduler::new(config.clone(), pool.clone(), hn_client.clone(), Arc::clone(&oracle));
    scheduler.start();
    tracing::info!("background scheduler started");

    let app_state = Arc::new(AppState { config: config.clone(), pool: pool.clone(), hn_client, oracle });

    let mutating_routes = Router::new()
        .route("/api/v1/stories/refresh", post(handlers::stories::refresh_stories))
        .route("/api/agent/proposals/:id/approve", post(handlers::agent::approve_proposal))
        .route("/api/agent/proposals/:id/reject", post(handlers::agent::reject_proposal))
        .route("/api/agent/proposals/:id/execute", post(handlers::agent::execute_proposal))
        .route("/api/agent/run", post(handlers::agent::trigger_run))
        .layer(axum_middleware::from_fn_with_state(Arc::clone(&app_state), middleware::require_api_key));

    let mut query_routes = Router::new()
        .route("/api/v1/stories", get(handlers::stories::list_stories))
        .route("/api/v1/stories/:id", get(handlers::stories::get_story))
        .route("/api/stories/advanced-filter.json", get(handlers::stories::advanced_filter))
        .route("/api/tags/grouped", get(handlers::tags::grouped_tags))
        .route("/health", get(handlers::health::health_check));

    if !config.environment.is_production() {
        query_routes = query_routes
            .route("/api/agent/runs", get(handlers::agent::list_runs))
            .route("/api/agent/runs/:id", get(handlers::agent::get_run))
            .route("/api/agent/proposals", get(handlers::agent::list_proposals))
            .route("/api/agent/proposals/:id", get(handlers::agent::get_proposal));
    } else {
        tracing::info!("agent endpoints disabled in production");
    }

    let app = Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(query_routes)
        .merge(mutating_routes)
        .with_state(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("server listening on http://{}", addr);
    tracing::info!("api documentation available at http://{}/api-docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

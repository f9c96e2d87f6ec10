mod errors;
mod handlers;
mod jobs;
mod routes;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use alexandria_config::Config;
use alexandria_contracts::analytics::{AnalyticsSink, NullAnalyticsSink};
use alexandria_contracts::queue::JobKind;
use alexandria_core::dedup::WorkResolutionRepository;
use alexandria_core::http_client::HttpClient;
use alexandria_core::persistence::{
    postgres, BackfillLogStore, CoverObjectStore, PostgresAdapters, PostgresQueueService, PostgresWorkResolutionRepository,
    S3CoverObjectStore,
};
use alexandria_core::providers::ProviderSet;
use alexandria_core::quota::InMemoryQuotaManager;
use alexandria_core::queue::{author as author_consumer, consume_batch, cover as cover_consumer, enrichment as enrichment_consumer};
use alexandria_core::registry::ProviderRegistry;

use jobs::JobStore;
use routes::v1;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "alexandria_server=info,alexandria_core=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(port = config.server_port, "alexandria-server configuration loaded");

    let pool = postgres::connect(&config.database_url).await?;
    postgres::run_migrations(&pool).await?;

    let http = Arc::new(tokio::sync::Mutex::new(HttpClient::new(&config.redis_url).await?));
    let quota: Arc<dyn alexandria_contracts::quota::QuotaManager> = InMemoryQuotaManager::new(config.quota.clone());
    let providers = Arc::new(ProviderSet::new(&config.providers, http.clone(), quota.clone()));

    let registry = Arc::new(ProviderRegistry::new());
    registry.register_all(providers.all()).await?;

    let adapters = Arc::new(PostgresAdapters::new(pool.clone()));
    let resolver: Arc<dyn WorkResolutionRepository> = Arc::new(PostgresWorkResolutionRepository::new(pool.clone()));
    let queue: Arc<dyn alexandria_contracts::queue::QueueService> = Arc::new(PostgresQueueService::new(pool.clone()));
    let covers: Arc<dyn CoverObjectStore> = Arc::new(S3CoverObjectStore::new(&config.providers).await?);
    let backfill_log = Arc::new(BackfillLogStore::new(pool.clone()));
    let analytics: Arc<dyn AnalyticsSink> = Arc::new(NullAnalyticsSink);

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        providers: providers.clone(),
        registry: registry.clone(),
        adapters: adapters.clone(),
        resolver: resolver.clone(),
        queue: queue.clone(),
        quota: quota.clone(),
        analytics: analytics.clone(),
        covers: covers.clone(),
        backfill_log: backfill_log.clone(),
        http: http.clone(),
        jobs: JobStore::new(),
    };

    spawn_queue_consumers(state.clone());

    let cors = match config.cors_allowed_origins.as_slice() {
        [] => CorsLayer::permissive(),
        origins => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
    };

    let app = Router::new()
        .route(v1::ENRICH_EDITION, post(handlers::enrich::enrich_edition))
        .route(v1::ENRICH_WORK, post(handlers::enrich::enrich_work))
        .route(v1::ENRICH_AUTHOR, post(handlers::enrich::enrich_author))
        .route(v1::ENRICH_QUEUE, post(handlers::enrich::enqueue_enrichment))
        .route(v1::ENRICH_QUEUE_BATCH, post(handlers::enrich::enqueue_enrichment_batch))
        .route(v1::ENRICH_BATCH_DIRECT, post(handlers::enrich::batch_direct))
        .route(v1::COVERS_QUEUE, post(handlers::covers::queue_covers))
        .route(v1::COVERS_PROCESS, post(handlers::covers::process_cover))
        .route(v1::COVERS_STATUS, get(handlers::covers::cover_status))
        .route(v1::COVERS_SERVE, get(handlers::covers::serve_cover))
        .route(v1::QUOTA_STATUS, get(handlers::quota::quota_status))
        .route(v1::AUTHORS_ENRICH_BIBLIOGRAPHY, post(handlers::authors::enrich_bibliography))
        .route(v1::HARVEST_START, post(handlers::harvest::start_harvest))
        .route(v1::HARVEST_BACKFILL, post(handlers::harvest::start_backfill))
        .route(v1::HARVEST_BACKFILL_STATUS, get(handlers::harvest::backfill_job_status))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "alexandria-server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// Spawns one polling loop per queue kind. Each loop dequeues a batch,
/// processes it, and sleeps briefly when the queue comes back empty so an
/// idle process doesn't spin.
fn spawn_queue_consumers(state: AppState) {
    let enrichment_deps = Arc::new(alexandria_core::queue::enrichment::EnrichmentConsumerDeps {
        env: state.request_env(),
        providers: state.providers.clone(),
        resolver: state.resolver.clone(),
        adapters: state.adapters.clone(),
        queue: state.queue.clone(),
    });
    let queue = state.queue.clone();
    tokio::spawn(async move {
        loop {
            match consume_batch(&queue, JobKind::Enrichment, {
                let deps = enrichment_deps.clone();
                move |lease| {
                    let deps = deps.clone();
                    async move { enrichment_consumer::handle_enrichment_job(deps, lease).await }
                }
            })
            .await
            {
                Ok(summary) if summary.dequeued == 0 => tokio::time::sleep(std::time::Duration::from_secs(5)).await,
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "enrichment consumer batch failed");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        }
    });

    let cover_deps = Arc::new(alexandria_core::queue::cover::CoverConsumerDeps {
        env: state.request_env(),
        providers: state.providers.clone(),
        adapters: state.adapters.clone(),
        object_store: state.covers.clone(),
    });
    let queue = state.queue.clone();
    tokio::spawn(async move {
        loop {
            match consume_batch(&queue, JobKind::Cover, {
                let deps = cover_deps.clone();
                move |lease| {
                    let deps = deps.clone();
                    async move { cover_consumer::handle_cover_job(deps, lease).await }
                }
            })
            .await
            {
                Ok(summary) if summary.dequeued == 0 => tokio::time::sleep(std::time::Duration::from_secs(5)).await,
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "cover consumer batch failed");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        }
    });

    let author_deps = Arc::new(alexandria_core::queue::author::AuthorConsumerDeps {
        env: state.request_env(),
        providers: state.providers.clone(),
        adapters: state.adapters.clone(),
    });
    let queue = state.queue.clone();
    tokio::spawn(async move {
        loop {
            match consume_batch(&queue, JobKind::Author, {
                let deps = author_deps.clone();
                move |lease| {
                    let deps = deps.clone();
                    async move { author_consumer::handle_author_job(deps, lease).await }
                }
            })
            .await
            {
                Ok(summary) if summary.dequeued == 0 => tokio::time::sleep(std::time::Duration::from_secs(5)).await,
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "author consumer batch failed");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            }
        }
    });
}

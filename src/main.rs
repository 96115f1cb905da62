use std::{future::IntoFuture, process, sync::Arc};

use taskmaster::{
    application::{
        dashboard::DashboardService,
        error::AppError,
        projects::ProjectService,
        repos::{ProjectsRepo, ProjectsWriteRepo, StoreHealth, TasksRepo, TasksWriteRepo},
        seed::Seeder,
        tasks::TaskService,
    },
    cache::{CacheConfig, CacheLayer, CacheStore, MemoryCacheStore},
    config,
    infra::{
        cache::RedisCacheStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        memory::InMemoryRepositories,
        telemetry,
    },
    util::clock::{Clock, SystemClock},
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Seed(_) => run_seed(settings).await,
    }
}

/// Every store port, satisfied by both the Postgres and in-memory adapters.
trait Store:
    TasksRepo + TasksWriteRepo + ProjectsRepo + ProjectsWriteRepo + StoreHealth + 'static
{
}

impl<T> Store for T where
    T: TasksRepo + TasksWriteRepo + ProjectsRepo + ProjectsWriteRepo + StoreHealth + 'static
{
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = build_cache(&settings, clock.clone())?;

    let state = match settings.database.url.as_deref() {
        Some(url) => {
            let repositories = Arc::new(connect_postgres(url, &settings).await?);
            PostgresRepositories::run_migrations(repositories.pool())
                .await
                .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
            build_http_state(repositories, clock, cache)
        }
        None => {
            warn!("no database url configured; serving a seeded in-memory store");
            let repositories = Arc::new(InMemoryRepositories::new());
            seeder(repositories.clone(), clock.clone(), cache.clone())
                .seed_if_empty()
                .await
                .map_err(|err| AppError::unexpected(format!("failed to seed demo data: {err}")))?;
            build_http_state(repositories, clock, cache)
        }
    };

    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let url = require_database_url(&settings)?;
    let repositories = connect_postgres(url, &settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!("database migrations applied");
    Ok(())
}

async fn run_seed(settings: config::Settings) -> Result<(), AppError> {
    let url = require_database_url(&settings)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = build_cache(&settings, clock.clone())?;
    let repositories = Arc::new(connect_postgres(url, &settings).await?);
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    match seeder(repositories, clock, cache).seed_if_empty().await {
        Ok(Some(report)) => {
            info!(projects = report.projects, tasks = report.tasks, "seed complete");
            Ok(())
        }
        Ok(None) => {
            info!("database already holds projects; nothing seeded");
            Ok(())
        }
        Err(err) => Err(AppError::unexpected(format!("failed to seed demo data: {err}"))),
    }
}

fn require_database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| AppError::from(InfraError::configuration("database url is not configured")))
}

async fn connect_postgres(
    url: &str,
    settings: &config::Settings,
) -> Result<PostgresRepositories, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    Ok(PostgresRepositories::new(pool))
}

fn build_cache(
    settings: &config::Settings,
    clock: Arc<dyn Clock>,
) -> Result<Option<Arc<CacheLayer>>, AppError> {
    let cache_settings = &settings.cache;
    if !cache_settings.enabled {
        info!("cache disabled; every read goes to the store");
        return Ok(None);
    }

    let store: Arc<dyn CacheStore> = match cache_settings.redis_url.as_deref() {
        Some(url) => {
            info!(pool_size = cache_settings.pool_size.get(), "using redis cache store");
            Arc::new(RedisCacheStore::connect(
                url,
                cache_settings.pool_size.get() as usize,
            )?)
        }
        None => {
            info!("no redis url configured; using the in-process cache store");
            Arc::new(MemoryCacheStore::new(clock))
        }
    };

    Ok(Some(Arc::new(CacheLayer::new(
        store,
        CacheConfig::from(cache_settings),
    ))))
}

fn seeder<S: Store>(
    repositories: Arc<S>,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<CacheLayer>>,
) -> Seeder {
    Seeder::new(repositories.clone(), repositories.clone(), repositories, clock)
        .with_cache_opt(cache)
}

fn build_http_state<S: Store>(
    repositories: Arc<S>,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<CacheLayer>>,
) -> HttpState {
    let tasks_read: Arc<dyn TasksRepo> = repositories.clone();
    let tasks_write: Arc<dyn TasksWriteRepo> = repositories.clone();
    let projects_read: Arc<dyn ProjectsRepo> = repositories.clone();
    let projects_write: Arc<dyn ProjectsWriteRepo> = repositories.clone();
    let health: Arc<dyn StoreHealth> = repositories;

    let tasks = TaskService::new(
        tasks_read.clone(),
        tasks_write,
        projects_read.clone(),
        clock.clone(),
    )
    .with_cache_opt(cache.clone());
    let projects = ProjectService::new(projects_read, projects_write, tasks_read.clone(), clock.clone())
        .with_cache_opt(cache.clone());
    let dashboard = DashboardService::new(tasks_read, clock).with_cache_opt(cache);

    HttpState {
        tasks: Arc::new(tasks),
        projects: Arc::new(projects),
        dashboard: Arc::new(dashboard),
        health,
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let stop = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let stop = stop.clone();
        async move { stop.notified().await }
    });
    let mut handle = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut handle => return server_result(joined),
        () = shutdown_signal() => {}
    }

    info!(
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested; draining connections"
    );
    stop.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, handle).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!("graceful shutdown timed out; dropping open connections");
            Ok(())
        }
    }
}

fn server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

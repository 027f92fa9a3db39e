//! Room allocation dashboard server.

use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use room_allocator_allocator::Allocator;
use room_allocator_api::AppState;
use room_allocator_config::AppConfig;
use room_allocator_domain::AllocationConfig;
use room_allocator_predictor::Predictor;
use room_allocator_simulator::Simulator;
use room_allocator_storage::{RoomRepository, SyntheticSeedConfig, create_pool, init_schema, seed_synthetic_data};
use room_allocator_workflow::Workflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(app = config.app_name, version = config.app_version, "starting room allocation server");

    let pool = create_pool(&config.database_path).await?;
    init_schema(&pool).await?;
    seed_synthetic_data(
        &pool,
        &SyntheticSeedConfig {
            random_seed: config.synthetic_random_seed,
            seed_days: config.synthetic_seed_days,
            weekday_occupied_probability: config.synthetic_weekday_occupied_probability,
            weekend_occupied_probability: config.synthetic_weekend_occupied_probability,
            time_slots: config.synthetic_time_slots.clone(),
        },
    )
    .await?;
    tracing::info!("database schema ready and synthetic data seeded");

    let repo = RoomRepository::new(pool.clone());

    let predictor = Arc::new(Predictor::new(repo.clone(), &config)?);
    predictor.train().await?;
    tracing::info!("prediction model trained");

    let allocation_defaults = AllocationConfig {
        idle_probability_threshold: config.allocation_idle_probability_threshold,
        stakeholder_usage_cap: config.allocation_stakeholder_usage_cap,
        solver_max_time_seconds: config.allocation_solver_max_time_seconds,
        solver_random_seed: config.allocation_solver_random_seed,
        objective_scale: config.allocation_objective_scale,
        cp_sat_workers: config.allocation_cp_sat_workers,
    };

    let allocator = Allocator::new(repo.clone(), predictor.clone(), config.allocation_forecast_history_days);
    let workflow_allocator = Allocator::new(repo.clone(), predictor.clone(), config.allocation_forecast_history_days);
    let simulator = Simulator::new(repo.clone(), predictor.clone(), &config);
    let workflow = Arc::new(Workflow::new(
        repo.clone(),
        predictor.clone(),
        workflow_allocator,
        simulator,
        &config,
    ));

    let auth = room_allocator_api::middleware::auth::AdminAuth::new(config.admin_token.clone());

    let state = Arc::new(AppState {
        pool,
        predictor,
        allocator,
        allocation_defaults,
        workflow,
        auth,
        config: config.clone(),
        start_time: Instant::now(),
    });

    let dashboard_index = format!("{}/../../demos/dashboard/index.html", env!("CARGO_MANIFEST_DIR"));
    let app = room_allocator_api::build_router(state, &dashboard_index);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(addr = config.bind_address, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

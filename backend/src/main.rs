mod config;
mod db;
mod error;
mod job_controller;
mod notifications;
mod services;

use crate::config::AppConfig;
use crate::db::SqliteStore;
use crate::job_controller::dispatcher::TaskDispatcher;
use crate::job_controller::runner::JobRunner;
use crate::job_controller::state::JobsState;
use crate::notifications::NotificationHub;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::load().map_err(io::Error::other)?;
    std::fs::create_dir_all(config.upload_dir())?;

    let store = SqliteStore::open(&config.database_path, config.result_batch_size)
        .map_err(io::Error::other)?;
    let hub = NotificationHub::new(config.subscriber_buffer);

    // Initialize the result backend and its updater task
    let (jobs_state, rx) = JobsState::new(100);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });
    tokio::spawn(job_controller::state::start_retention_sweeper(
        jobs_state.clone(),
        Duration::from_secs(config.result_ttl_secs),
        Duration::from_secs(60),
    ));

    let runner = JobRunner::new(
        config.media_root.clone(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        hub.clone(),
        jobs_state.tx.clone(),
    );
    let dispatcher = TaskDispatcher::new(jobs_state.clone(), Arc::new(runner), config.workers);

    let host = config.host.clone();
    let port = config.port;
    info!(
        "Server running at http://{}:{} with {} workers",
        host, port, config.workers
    );

    let config = web::Data::new(config);
    let store = web::Data::new(store);
    let hub = web::Data::new(hub);
    let jobs_state = web::Data::new(jobs_state);
    let dispatcher = web::Data::new(dispatcher);

    HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(store.clone())
            .app_data(hub.clone())
            .app_data(jobs_state.clone())
            .app_data(dispatcher.clone())
            .service(services::data_sources::csv::configure_routes())
            .service(services::tasks::configure_routes())
            .service(services::results::configure_routes())
            .service(services::ws::configure_routes())
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

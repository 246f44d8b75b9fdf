// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Pod, Secret, Service};
use kube::{
    runtime::{controller::Action, reflector::ObjectRef, watcher::Config, Controller},
    Api, Client, Resource, ResourceExt,
};
use mariadb_operator::{
    config::OperatorConfig,
    constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS},
    context::Context,
    crd::MariaDB,
    errors::MariaDbError,
    labels::MARIADB_REF_LABEL,
    metrics,
    reconcilers::reconcile_mariadb,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] MariaDbError);

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(TOKIO_WORKER_THREADS);

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("mariadb-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    // Respects RUST_LOG, otherwise defaults to INFO.
    // RUST_LOG_FORMAT=json switches to structured output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting MariaDB Controller");
    debug!(?config, "Loaded operator configuration");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_addr = config.metrics_bind_address.clone();
    let ctx = Arc::new(Context::new(client, config));

    // Neither future should ever finish
    tokio::select! {
        result = run_mariadb_controller(ctx) => {
            error!("CRITICAL: MariaDB controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("MariaDB controller exited unexpectedly without error")
        }
        result = run_metrics_server(&metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

/// `Api` scoped to the watch namespace, or cluster-wide.
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Map a labeled secret to the `MariaDB` it belongs to.
fn secret_to_mariadb(secret: Secret) -> Option<ObjectRef<MariaDB>> {
    let name = secret.labels().get(MARIADB_REF_LABEL)?.clone();
    let namespace = secret.namespace()?;
    Some(ObjectRef::new(&name).within(&namespace))
}

/// Run the `MariaDB` controller
async fn run_mariadb_controller(ctx: Arc<Context>) -> Result<()> {
    let namespace = ctx.config.namespace().map(str::to_string);
    let ns = namespace.as_deref();
    match ns {
        Some(ns) => info!("Starting MariaDB controller in namespace {}", ns),
        None => info!("Starting MariaDB controller for all namespaces"),
    }

    let client = &ctx.client;
    Controller::new(scoped_api::<MariaDB>(client, ns), Config::default())
        .owns(scoped_api::<Service>(client, ns), Config::default())
        .owns(scoped_api::<ConfigMap>(client, ns), Config::default())
        .owns(scoped_api::<PersistentVolumeClaim>(client, ns), Config::default())
        .owns(scoped_api::<Pod>(client, ns), Config::default())
        .owns(scoped_api::<Job>(client, ns), Config::default())
        .watches(
            scoped_api::<Secret>(client, ns),
            Config::default().labels(MARIADB_REF_LABEL),
            secret_to_mariadb,
        )
        .shutdown_on_signal()
        .run(reconcile_mariadb_wrapper, error_policy, ctx.clone())
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!("Reconciled MariaDB {}", obj.name),
                Err(e) => warn!("MariaDB controller stream error: {}", e),
            }
        })
        .await;

    Ok(())
}

/// Reconcile wrapper for `MariaDB`
async fn reconcile_mariadb_wrapper(
    db: Arc<MariaDB>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    debug!(
        name = %db.name_any(),
        namespace = ?db.namespace(),
        "Reconcile wrapper called for MariaDB"
    );

    match reconcile_mariadb(db.clone(), ctx).await {
        Ok(action) => {
            info!("Reconciled MariaDB: {}", db.name_any());
            Ok(action)
        }
        Err(e) => {
            error!("Failed to reconcile MariaDB {}: {}", db.name_any(), e);
            Err(e.into())
        }
    }
}

/// Error policy for the `MariaDB` controller
fn error_policy(db: Arc<MariaDB>, err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    let after = err.0.requeue_after();
    debug!(
        "Requeueing MariaDB {} in {:?} after error",
        db.name_any(),
        after
    );
    Action::requeue(after)
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Serve `/metrics` and `/healthz`
async fn run_metrics_server(addr: &str) -> Result<()> {
    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics server to {addr}"))?;
    info!("Serving metrics on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

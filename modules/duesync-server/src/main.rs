use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use duesync_common::Config;
use duesync_pipeline::workflows::course_sync::{CourseSyncWorkflow, CourseSyncWorkflowImpl};
use duesync_pipeline::workflows::SyncDeps;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting duesync-server");

    let config = Config::from_env()?;
    let port = config.server_port;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    duesync_store::migrate(&pool).await?;
    tracing::info!("Migrations complete");

    let deps = Arc::new(SyncDeps::from_config(pool, &config));

    // ─── Restate Endpoint ────────────────────────────────────────────────────

    let endpoint = restate_sdk::endpoint::Endpoint::builder()
        .bind(CourseSyncWorkflowImpl::with_deps(deps).serve())
        .build();

    // Auto-register with the Restate admin so deploys pick up the service.
    if let Some(admin_url) = &config.restate_admin_url {
        let self_url = config
            .restate_self_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let client = reqwest::Client::new();
        let mut request = client
            .post(format!("{admin_url}/deployments"))
            .json(&serde_json::json!({
                "uri": self_url,
                "force": true,
            }));

        if let Some(token) = &config.restate_auth_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(resp) => {
                tracing::info!(status = %resp.status(), "Registered with Restate admin");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register with Restate admin");
            }
        }
    }

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "Serving sync workflow");

    restate_sdk::http_server::HttpServer::new(endpoint)
        .listen_and_serve(addr.parse()?)
        .await;

    Ok(())
}

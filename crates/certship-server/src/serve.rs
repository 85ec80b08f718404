//! Serve command: wires the AWS backends to the issuance service and runs
//! the HTTP server

use std::future::IntoFuture;
use std::sync::Arc;

use certship_issuer::{IssueService, TokioCommandRunner, TracingSink};
use certship_secrets::{AwsSecretStore, SecretResolver};
use certship_storage::S3ObjectStore;
use clap::Args;
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{self, AppState, CertsApiDoc};

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "0.0.0.0:8080", env = "CERTSHIP_ADDRESS")]
    pub address: String,

    /// Path to the certbot executable
    #[arg(long, default_value = "certbot", env = "CERTSHIP_CERTBOT_PATH")]
    pub certbot_path: String,

    /// Custom S3 endpoint (MinIO-style deployments); forces path-style
    /// addressing when set
    #[arg(long, env = "CERTSHIP_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.serve())
    }

    async fn serve(self) -> anyhow::Result<()> {
        let secrets = Arc::new(AwsSecretStore::from_env().await);
        let store = Arc::new(S3ObjectStore::from_env(self.s3_endpoint.as_deref()).await);
        let service = IssueService::new(
            SecretResolver::new(secrets),
            store,
            Arc::new(TokioCommandRunner),
            Arc::new(TracingSink),
            self.certbot_path,
        );
        let state = Arc::new(AppState { service });

        let app = handlers::configure_routes()
            .with_state(state)
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", CertsApiDoc::openapi()));

        let listener = TcpListener::bind(&self.address).await?;
        info!(address = %self.address, "Certship server listening");
        axum::serve(listener, app).into_future().await?;
        Ok(())
    }
}

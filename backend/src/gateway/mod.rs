pub mod dynamodb_gateway;
pub mod memory;
pub mod models;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use uuid::Uuid;

use crate::config::ServerConfig;
use dynamodb_gateway::DynamoDbGateway;
use memory::InMemoryGateway;
use models::{HistoryRecord, ReferenceRecord};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
    #[error("Fixture error: {0}")]
    Fixture(String),
}

/// Read-only access to reference cases and per-user history.
///
/// Implementations report failures; the analyzer decides to treat any
/// failure as "no data".
#[allow(async_fn_in_trait)]
pub trait ReferenceGateway {
    async fn fetch_reference_sample(
        &self,
        limit: usize,
    ) -> Result<Vec<ReferenceRecord>, GatewayError>;

    /// Most recent records first.
    async fn fetch_recent_history(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, GatewayError>;
}

/// The store selected at startup.
#[derive(Clone)]
pub enum GatewayBackend {
    DynamoDb(DynamoDbGateway),
    Fixtures(InMemoryGateway),
    Disabled,
}

impl GatewayBackend {
    /// DynamoDB when both tables are configured, otherwise fixtures when a
    /// fixture file is given, otherwise no store at all.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, GatewayError> {
        if let (Some(reference_table), Some(history_table)) =
            (&config.reference_table, &config.history_table)
        {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let client = DynamoDbClient::new(&aws_config);
            log::info!(
                "Using DynamoDB tables '{}' (reference) and '{}' (history)",
                reference_table,
                history_table
            );
            return Ok(GatewayBackend::DynamoDb(DynamoDbGateway::new(
                client,
                reference_table.clone(),
                history_table.clone(),
            )));
        }

        if let Some(path) = &config.reference_fixtures {
            return Ok(GatewayBackend::Fixtures(InMemoryGateway::from_fixture_file(
                path,
            )?));
        }

        log::warn!(
            "No reference store configured. Set DYNAMODB_REFERENCE_TABLE and DYNAMODB_HISTORY_TABLE \
            or REFERENCE_FIXTURES; analyses will use the variance thresholds only."
        );
        Ok(GatewayBackend::Disabled)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayBackend::DynamoDb(_) => "dynamodb",
            GatewayBackend::Fixtures(_) => "fixtures",
            GatewayBackend::Disabled => "disabled",
        }
    }
}

impl ReferenceGateway for GatewayBackend {
    async fn fetch_reference_sample(
        &self,
        limit: usize,
    ) -> Result<Vec<ReferenceRecord>, GatewayError> {
        match self {
            GatewayBackend::DynamoDb(gateway) => gateway.fetch_reference_sample(limit).await,
            GatewayBackend::Fixtures(gateway) => gateway.fetch_reference_sample(limit).await,
            GatewayBackend::Disabled => Ok(Vec::new()),
        }
    }

    async fn fetch_recent_history(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, GatewayError> {
        match self {
            GatewayBackend::DynamoDb(gateway) => gateway.fetch_recent_history(user_id, limit).await,
            GatewayBackend::Fixtures(gateway) => gateway.fetch_recent_history(user_id, limit).await,
            GatewayBackend::Disabled => Ok(Vec::new()),
        }
    }
}

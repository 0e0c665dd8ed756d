//! Lambda entry point: configuration, resource wiring and the status response.

use std::future::Future;

use anyhow::Context;
use lambda_runtime::LambdaEvent;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::delivery::{Delivery, DeliveryReport};
use crate::identity::{IdentityResolver, StsIdentityResolver};
use crate::regions::RegionSet;
use crate::scan::{scan_regions, AwsBackendFactory, BackendFactory};

const SUCCESS_MESSAGE: &str = "API discovery completed successfully";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// API Gateway style function result; `body` holds a JSON document.
pub struct FunctionResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl FunctionResponse {
    fn ok(summary: &Summary) -> Self {
        Self {
            status_code: 200,
            body: serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    fn error(error: &str, message: String) -> Self {
        let body = serde_json::json!({ "error": error, "message": message });
        Self {
            status_code: 500,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Operational report of one completed invocation.
pub struct Summary {
    pub message: String,
    pub total_apis: usize,
    pub target_account: String,
    pub regions_scanned: usize,
    pub regions_requested: usize,
    pub regions_failed: usize,
    pub regions: Vec<String>,
    #[serde(flatten)]
    pub delivery: DeliveryReport,
}

/// Resource handles for one invocation.
pub struct Collector {
    identity: Box<dyn IdentityResolver>,
    backends: Box<dyn BackendFactory>,
    delivery: Delivery,
}

impl Collector {
    pub fn new(
        identity: Box<dyn IdentityResolver>,
        backends: Box<dyn BackendFactory>,
        delivery: Delivery,
    ) -> Self {
        Self {
            identity,
            backends,
            delivery,
        }
    }

    /// AWS-backed collector using the ambient credentials.
    pub async fn from_aws(cfg: &Config) -> anyhow::Result<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        Ok(Self::new(
            Box::new(StsIdentityResolver::new(&sdk_config)),
            Box::new(AwsBackendFactory::new(sdk_config)),
            Delivery::http(&cfg.delivery)?,
        ))
    }

    /// Resolve the account, scan all regions, then deliver whatever was found.
    pub async fn run(&self, regions: &RegionSet) -> anyhow::Result<Summary> {
        let account_id = self
            .identity
            .account_id()
            .await
            .context("get current account id")?;
        tracing::info!(
            account_id = %account_id,
            count = regions.len(),
            regions = %regions,
            "scanning current account"
        );

        let scan = scan_regions(self.backends.as_ref(), &account_id, regions).await;
        tracing::info!(total_apis = scan.apis.len(), "total APIs discovered");

        let delivery = self.delivery.deliver(&scan.apis).await;

        Ok(Summary {
            message: SUCCESS_MESSAGE.to_string(),
            total_apis: scan.apis.len(),
            target_account: account_id,
            regions_scanned: scan.regions_scanned,
            regions_requested: scan.regions_requested,
            regions_failed: scan.regions_failed,
            regions: regions.as_slice().to_vec(),
            delivery,
        })
    }
}

/// Turn a configuration result into a status response, building the collector only once the
/// configuration is valid.
pub async fn handle_invocation<B, Fut>(
    config: Result<Config, ConfigError>,
    build: B,
) -> FunctionResponse
where
    B: FnOnce(Config) -> Fut,
    Fut: Future<Output = anyhow::Result<Collector>>,
{
    let cfg = match config {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, "configuration error");
            return FunctionResponse::error("Configuration error", err.to_string());
        }
    };

    let regions = cfg.regions.clone();
    let result = async {
        let collector = build(cfg).await?;
        collector.run(&regions).await
    }
    .await;

    match result {
        Ok(summary) => FunctionResponse::ok(&summary),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "API discovery failed");
            FunctionResponse::error("API discovery failed", format!("{err:#}"))
        }
    }
}

/// `lambda_runtime` handler. The trigger payload is ignored.
pub async fn function_handler(
    event: LambdaEvent<serde_json::Value>,
) -> Result<FunctionResponse, lambda_runtime::Error> {
    let (_payload, context) = event.into_parts();
    tracing::info!(request_id = %context.request_id, "starting API Gateway discovery");

    let response = handle_invocation(Config::from_env(), |cfg| async move {
        Collector::from_aws(&cfg).await
    })
    .await;

    Ok(response)
}

//! Region scanning and the cross-region fan-out.

use anyhow::Context;
use async_trait::async_trait;

use crate::apigateway::{enumerate_region, ApiGatewayBackend, AwsApiGateway};
use crate::model::DiscoveredApi;
use crate::regions::RegionSet;

#[async_trait]
/// Hands out API Gateway access for one region. Each call returns a fresh backend.
pub trait BackendFactory: Send + Sync {
    async fn connect(&self, region: &str) -> anyhow::Result<Box<dyn ApiGatewayBackend>>;
}

/// Builds per-region AWS clients from one shared SDK config.
pub struct AwsBackendFactory {
    sdk_config: aws_config::SdkConfig,
}

impl AwsBackendFactory {
    pub fn new(sdk_config: aws_config::SdkConfig) -> Self {
        Self { sdk_config }
    }
}

#[async_trait]
impl BackendFactory for AwsBackendFactory {
    async fn connect(&self, region: &str) -> anyhow::Result<Box<dyn ApiGatewayBackend>> {
        Ok(Box::new(AwsApiGateway::for_region(&self.sdk_config, region)))
    }
}

#[derive(Debug)]
/// Settled result of scanning one region.
pub struct ScanOutcome {
    pub region: String,
    pub result: anyhow::Result<Vec<DiscoveredApi>>,
}

#[derive(Debug, Default)]
/// Aggregate of all regional outcomes.
pub struct ScanReport {
    pub apis: Vec<DiscoveredApi>,
    pub regions_requested: usize,
    pub regions_scanned: usize,
    pub regions_failed: usize,
}

impl ScanReport {
    /// Concatenate successful regions in request order and count failures.
    pub fn from_outcomes(account_id: &str, outcomes: Vec<ScanOutcome>) -> Self {
        let mut report = Self {
            regions_requested: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome.result {
                Ok(apis) => {
                    tracing::info!(
                        account_id = %account_id,
                        region = %outcome.region,
                        apis = apis.len(),
                        "region scanned"
                    );
                    report.regions_scanned += 1;
                    report.apis.extend(apis);
                }
                Err(err) => {
                    tracing::error!(
                        account_id = %account_id,
                        region = %outcome.region,
                        error = %format!("{err:#}"),
                        "region scan failed"
                    );
                    report.regions_failed += 1;
                }
            }
        }

        tracing::info!(
            scanned = report.regions_scanned,
            failed = report.regions_failed,
            total_apis = report.apis.len(),
            "scan complete"
        );
        report
    }
}

/// Scan one region. Errors are logged here and returned so the caller can isolate them.
pub async fn scan_region(
    factory: &dyn BackendFactory,
    account_id: &str,
    region: &str,
) -> anyhow::Result<Vec<DiscoveredApi>> {
    tracing::info!(account_id = %account_id, region = %region, "scanning region");

    let backend = match factory
        .connect(region)
        .await
        .with_context(|| format!("connect to API Gateway in {region}"))
    {
        Ok(backend) => backend,
        Err(err) => {
            tracing::error!(
                account_id = %account_id,
                region = %region,
                error = %format!("{err:#}"),
                "error scanning region"
            );
            return Err(err);
        }
    };

    Ok(enumerate_region(backend.as_ref(), account_id, region).await)
}

/// Scan every region concurrently and wait for all of them to settle.
pub async fn scan_regions(
    factory: &dyn BackendFactory,
    account_id: &str,
    regions: &RegionSet,
) -> ScanReport {
    tracing::info!(regions = regions.len(), "starting parallel region scan");

    let results =
        futures::future::join_all(regions.iter().map(|region| scan_region(factory, account_id, region)))
            .await;

    let outcomes = regions
        .iter()
        .zip(results)
        .map(|(region, result)| ScanOutcome {
            region: region.to_owned(),
            result,
        })
        .collect();

    ScanReport::from_outcomes(account_id, outcomes)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::apigateway::tests::FakeBackend;
    use crate::model::ApiType;

    /// Serves one page of HTTP APIs per region; regions in `failing` cannot be connected to.
    #[derive(Default)]
    pub(crate) struct FakeFactory {
        pub apis: HashMap<String, Vec<&'static str>>,
        pub failing: Vec<String>,
        pub delays: HashMap<String, Duration>,
        pub connects: AtomicUsize,
    }

    impl FakeFactory {
        pub fn region(mut self, region: &str, ids: &[&'static str]) -> Self {
            self.apis.insert(region.to_string(), ids.to_vec());
            self
        }

        pub fn failing(mut self, region: &str) -> Self {
            self.failing.push(region.to_string());
            self
        }

        pub fn delayed(mut self, region: &str, delay: Duration) -> Self {
            self.delays.insert(region.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl BackendFactory for FakeFactory {
        async fn connect(&self, region: &str) -> anyhow::Result<Box<dyn ApiGatewayBackend>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(region) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.iter().any(|r| r == region) {
                anyhow::bail!("credentials expired");
            }
            let ids = self.apis.get(region).cloned().unwrap_or_default();
            Ok(Box::new(FakeBackend::default().page(
                ApiType::Http,
                None,
                &ids,
                None,
            )))
        }
    }

    #[async_trait]
    impl BackendFactory for std::sync::Arc<FakeFactory> {
        async fn connect(&self, region: &str) -> anyhow::Result<Box<dyn ApiGatewayBackend>> {
            (**self).connect(region).await
        }
    }

    fn ids(apis: &[DiscoveredApi]) -> Vec<(&str, &str)> {
        apis.iter()
            .map(|a| (a.region.as_str(), a.api_id.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn region_scan_propagates_connect_failure() {
        let factory = FakeFactory::default().failing("eu-west-1");
        let err = scan_region(&factory, "acct", "eu-west-1").await.unwrap_err();
        assert!(format!("{err:#}").contains("credentials expired"));
    }

    #[tokio::test]
    async fn region_scan_returns_enumerated_apis() {
        let factory = FakeFactory::default().region("us-east-1", &["a", "b"]);
        let apis = scan_region(&factory, "acct", "us-east-1").await.unwrap();
        assert_eq!(ids(&apis), [("us-east-1", "a"), ("us-east-1", "b")]);
        assert!(apis.iter().all(|a| a.account_id == "acct"));
    }

    #[tokio::test]
    async fn failed_region_is_isolated() {
        let factory = FakeFactory::default()
            .region("us-east-1", &["a", "b"])
            .failing("eu-west-1")
            .region("ap-south-1", &["c"]);
        let regions = RegionSet::parse("us-east-1,eu-west-1,ap-south-1");

        let report = scan_regions(&factory, "acct", &regions).await;

        assert_eq!(
            ids(&report.apis),
            [("us-east-1", "a"), ("us-east-1", "b"), ("ap-south-1", "c")]
        );
        assert_eq!(report.regions_requested, 3);
        assert_eq!(report.regions_scanned, 2);
        assert_eq!(report.regions_failed, 1);
        assert_eq!(factory.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn all_regions_failing_yields_empty_report() {
        let factory = FakeFactory::default().failing("us-east-1").failing("us-east-2");
        let regions = RegionSet::parse("us-east-1,us-east-2");

        let report = scan_regions(&factory, "acct", &regions).await;
        assert!(report.apis.is_empty());
        assert_eq!(report.regions_failed, 2);
        assert_eq!(report.regions_scanned, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn regions_are_scanned_concurrently() {
        let factory = FakeFactory::default()
            .region("us-east-1", &["a"])
            .delayed("us-east-1", Duration::from_millis(300))
            .region("eu-west-1", &["b"])
            .delayed("eu-west-1", Duration::from_millis(200));
        let regions = RegionSet::parse("us-east-1,eu-west-1");

        let started = tokio::time::Instant::now();
        let report = scan_regions(&factory, "acct", &regions).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "{elapsed:?}");
        // Aggregation follows request order, not completion order.
        assert_eq!(ids(&report.apis), [("us-east-1", "a"), ("eu-west-1", "b")]);
    }

    #[test]
    fn outcomes_aggregate_in_order() {
        let api = |region: &str, id: &str| DiscoveredApi {
            account_id: "acct".into(),
            region: region.into(),
            api_id: id.into(),
            api_name: String::new(),
            api_type: ApiType::Rest,
            stages: Vec::new(),
            endpoint: crate::model::endpoint_for(id, region),
        };

        let report = ScanReport::from_outcomes(
            "acct",
            vec![
                ScanOutcome {
                    region: "r1".into(),
                    result: Ok(vec![api("r1", "x")]),
                },
                ScanOutcome {
                    region: "r2".into(),
                    result: Err(anyhow::anyhow!("boom")),
                },
                ScanOutcome {
                    region: "r3".into(),
                    result: Ok(vec![api("r3", "y"), api("r3", "z")]),
                },
            ],
        );

        assert_eq!(ids(&report.apis), [("r1", "x"), ("r3", "y"), ("r3", "z")]);
        assert_eq!(report.regions_scanned, 2);
        assert_eq!(report.regions_failed, 1);
        assert_eq!(report.regions_requested, 3);
    }
}

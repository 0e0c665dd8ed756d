//! API Gateway enumeration for a single region.
//!
//! REST APIs (API Gateway v1) and HTTP APIs (API Gateway v2) are listed through separate
//! management APIs but share one shape here: page through the APIs, resolve each API's stages and
//! emit a [`DiscoveredApi`]. Failures are absorbed as close to the call as possible:
//! - a failed stage lookup yields an empty stage list for that API;
//! - a failed page request ends that listing early, keeping what was already collected.

use anyhow::Context;
use async_trait::async_trait;

use crate::model::{endpoint_for, ApiType, DiscoveredApi};

/// Page size requested from both list operations.
pub const PAGE_SIZE: i32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// One page of a list call. `cursor` is `None` once the listing is exhausted.
pub struct ApiPage {
    pub items: Vec<ApiSummary>,
    pub cursor: Option<String>,
}

#[async_trait]
/// Regional API Gateway management calls, abstracted so enumeration can be tested without AWS.
pub trait ApiGatewayBackend: Send + Sync {
    async fn list_apis(&self, kind: ApiType, cursor: Option<String>) -> anyhow::Result<ApiPage>;

    async fn list_stages(&self, kind: ApiType, api_id: &str) -> anyhow::Result<Vec<String>>;
}

/// AWS SDK implementation of [`ApiGatewayBackend`], bound to one region.
pub struct AwsApiGateway {
    rest: aws_sdk_apigateway::Client,
    http: aws_sdk_apigatewayv2::Client,
}

impl AwsApiGateway {
    /// Build fresh clients for `region` on top of the shared SDK config.
    pub fn for_region(sdk_config: &aws_config::SdkConfig, region: &str) -> Self {
        let region = aws_config::Region::new(region.to_owned());

        let rest = aws_sdk_apigateway::config::Builder::from(sdk_config)
            .region(region.clone())
            .build();
        let http = aws_sdk_apigatewayv2::config::Builder::from(sdk_config)
            .region(region)
            .build();

        Self {
            rest: aws_sdk_apigateway::Client::from_conf(rest),
            http: aws_sdk_apigatewayv2::Client::from_conf(http),
        }
    }

    async fn rest_apis(&self, position: Option<String>) -> anyhow::Result<ApiPage> {
        let out = self
            .rest
            .get_rest_apis()
            .limit(PAGE_SIZE)
            .set_position(position)
            .send()
            .await
            .context("get_rest_apis")?;

        let items = out
            .items()
            .iter()
            .filter_map(|api| summary(ApiType::Rest, owned(api.id()), owned(api.name())))
            .collect();

        Ok(ApiPage {
            items,
            cursor: owned(out.position()),
        })
    }

    async fn http_apis(&self, next_token: Option<String>) -> anyhow::Result<ApiPage> {
        let out = self
            .http
            .get_apis()
            .max_results(PAGE_SIZE.to_string())
            .set_next_token(next_token)
            .send()
            .await
            .context("get_apis")?;

        let items = out
            .items()
            .iter()
            .filter_map(|api| summary(ApiType::Http, owned(api.api_id()), owned(api.name())))
            .collect();

        Ok(ApiPage {
            items,
            cursor: owned(out.next_token()),
        })
    }

    async fn rest_stages(&self, api_id: &str) -> anyhow::Result<Vec<String>> {
        let out = self
            .rest
            .get_stages()
            .rest_api_id(api_id)
            .send()
            .await
            .with_context(|| format!("get_stages rest_api_id={api_id}"))?;

        Ok(out
            .item()
            .iter()
            .filter_map(|stage| owned(stage.stage_name()))
            .collect())
    }

    async fn http_stages(&self, api_id: &str) -> anyhow::Result<Vec<String>> {
        let out = self
            .http
            .get_stages()
            .api_id(api_id)
            .send()
            .await
            .with_context(|| format!("get_stages api_id={api_id}"))?;

        Ok(out
            .items()
            .iter()
            .filter_map(|stage| owned(stage.stage_name()))
            .collect())
    }
}

#[async_trait]
impl ApiGatewayBackend for AwsApiGateway {
    async fn list_apis(&self, kind: ApiType, cursor: Option<String>) -> anyhow::Result<ApiPage> {
        match kind {
            ApiType::Rest => self.rest_apis(cursor).await,
            ApiType::Http => self.http_apis(cursor).await,
        }
    }

    async fn list_stages(&self, kind: ApiType, api_id: &str) -> anyhow::Result<Vec<String>> {
        match kind {
            ApiType::Rest => self.rest_stages(api_id).await,
            ApiType::Http => self.http_stages(api_id).await,
        }
    }
}

// Members marked `@required` in the service model come back as `&str` rather than `Option<&str>`;
// accept both.
fn owned<'a>(value: impl Into<Option<&'a str>>) -> Option<String> {
    value.into().map(str::to_owned)
}

fn summary(kind: ApiType, id: Option<String>, name: Option<String>) -> Option<ApiSummary> {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
        tracing::warn!(api_type = %kind, name = ?name, "skipping API without an id");
        return None;
    };
    Some(ApiSummary {
        id,
        name: name.unwrap_or_default(),
    })
}

/// Stage names of one API. Any lookup error is logged and yields an empty list.
pub async fn resolve_stages(
    backend: &dyn ApiGatewayBackend,
    kind: ApiType,
    api_id: &str,
) -> Vec<String> {
    match backend.list_stages(kind, api_id).await {
        Ok(stages) => stages,
        Err(err) => {
            tracing::error!(api_type = %kind, api_id = %api_id, error = %format!("{err:#}"), "error getting stages");
            Vec::new()
        }
    }
}

/// Page through every API of `kind`, stopping at the first failed page request.
pub async fn enumerate_apis(
    backend: &dyn ApiGatewayBackend,
    kind: ApiType,
    account_id: &str,
    region: &str,
) -> Vec<DiscoveredApi> {
    let mut apis = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = match backend.list_apis(kind, cursor.take()).await {
            Ok(page) => page,
            Err(err) => {
                tracing::error!(
                    api_type = %kind,
                    region = %region,
                    collected = apis.len(),
                    error = %format!("{err:#}"),
                    "error listing APIs"
                );
                break;
            }
        };

        for item in page.items {
            let stages = resolve_stages(backend, kind, &item.id).await;
            apis.push(DiscoveredApi {
                account_id: account_id.to_owned(),
                region: region.to_owned(),
                endpoint: endpoint_for(&item.id, region),
                api_id: item.id,
                api_name: item.name,
                api_type: kind,
                stages,
            });
        }

        match page.cursor.filter(|c| !c.is_empty()) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    apis
}

/// REST and HTTP APIs of one region, listed concurrently. REST APIs come first.
pub async fn enumerate_region(
    backend: &dyn ApiGatewayBackend,
    account_id: &str,
    region: &str,
) -> Vec<DiscoveredApi> {
    let (mut rest, http) = tokio::join!(
        enumerate_apis(backend, ApiType::Rest, account_id, region),
        enumerate_apis(backend, ApiType::Http, account_id, region),
    );
    rest.extend(http);
    rest
}

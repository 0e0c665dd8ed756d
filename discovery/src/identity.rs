//! Account lookup for the credentials the function runs under.

use anyhow::Context;
use async_trait::async_trait;

#[async_trait]
/// Resolves the account id of the ambient identity.
pub trait IdentityResolver: Send + Sync {
    async fn account_id(&self) -> anyhow::Result<String>;
}

/// STS `GetCallerIdentity` implementation of [`IdentityResolver`].
pub struct StsIdentityResolver {
    client: aws_sdk_sts::Client,
}

impl StsIdentityResolver {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sts::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl IdentityResolver for StsIdentityResolver {
    async fn account_id(&self) -> anyhow::Result<String> {
        let out = self
            .client
            .get_caller_identity()
            .send()
            .await
            .context("sts get_caller_identity")?;

        out.account()
            .map(str::to_owned)
            .context("get_caller_identity returned no account")
    }
}

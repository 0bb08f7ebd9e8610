//! Shared AWS SDK configuration for the queue and storage clients.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

use crate::config::{resolve_env_var, AwsConfig};

/// Build an [`SdkConfig`] from the `[aws]` section.
///
/// Static credentials are used when both keys resolve; otherwise the default
/// provider chain (environment, profile, instance role) applies.
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));

    if let (Some(key), Some(secret)) = (
        resolve_env_var(&config.access_key_id),
        resolve_env_var(&config.secret_access_key),
    ) {
        let credentials = Credentials::new(key, secret, None, None, "thumbkit-config");
        loader = loader.credentials_provider(credentials);
    }

    if let Some(endpoint) = config.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
        tracing::debug!("Using custom AWS endpoint {endpoint}");
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}

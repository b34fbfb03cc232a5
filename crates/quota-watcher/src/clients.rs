// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! AWS SDK client bundles, one per account generation.
//!
//! A bundle is immutable once built. Credential rotation builds a whole new
//! bundle and swaps it in; polls already in flight keep the generation they
//! captured and are never cancelled.

use crate::api::{ApiError, CertificateApi, EdgeApi, ObjectStoreApi, QuotaApi};
use crate::error::WatcherError;
use crate::region;
use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_servicequotas::types::RequestStatus;
use std::collections::HashMap;
use std::sync::Arc;

/// Region the global-service clients (S3, CloudFront) are built against.
pub const DEFAULT_CLIENT_REGION: &str = "us-west-2";

const ASSUME_ROLE_SESSION_NAME: &str = "quota-exporter";

/// One monitored account: a label plus either a static key pair or an
/// assumed-role ARN.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub label: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub role_arn: Option<String>,
}

/// The full client set for one account, behind the API trait seams.
pub struct ClientBundle {
    pub account: String,
    pub object_store: Arc<dyn ObjectStoreApi>,
    pub certificates: Arc<dyn CertificateApi>,
    pub edge: Arc<dyn EdgeApi>,
    pub quotas: Arc<dyn QuotaApi>,
}

/// Build a fresh client bundle for the account.
///
/// ACM and Service Quotas get one client per tracked region; S3 and
/// CloudFront are global and share the default-region config.
pub async fn build_bundle(config: &AccountConfig) -> Result<ClientBundle, WatcherError> {
    let base = load_base_config(config).await?;

    let mut acm_clients = HashMap::new();
    let mut quota_clients = HashMap::new();
    for tracked in region::TRACKED_REGIONS {
        let acm_config = aws_sdk_acm::config::Builder::from(&base)
            .region(Region::new(*tracked))
            .build();
        acm_clients.insert(
            (*tracked).to_string(),
            aws_sdk_acm::Client::from_conf(acm_config),
        );

        let quotas_config = aws_sdk_servicequotas::config::Builder::from(&base)
            .region(Region::new(*tracked))
            .build();
        quota_clients.insert(
            (*tracked).to_string(),
            aws_sdk_servicequotas::Client::from_conf(quotas_config),
        );
    }

    Ok(ClientBundle {
        account: config.label.clone(),
        object_store: Arc::new(SdkObjectStore {
            client: aws_sdk_s3::Client::new(&base),
        }),
        certificates: Arc::new(SdkCertificates {
            clients: acm_clients,
        }),
        edge: Arc::new(SdkEdge {
            client: aws_sdk_cloudfront::Client::new(&base),
        }),
        quotas: Arc::new(SdkQuotas {
            clients: quota_clients,
        }),
    })
}

async fn load_base_config(config: &AccountConfig) -> Result<SdkConfig, WatcherError> {
    let loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(DEFAULT_CLIENT_REGION));

    if let Some(role_arn) = &config.role_arn {
        let provider = AssumeRoleProvider::builder(role_arn.as_str())
            .session_name(ASSUME_ROLE_SESSION_NAME)
            .region(Region::new(DEFAULT_CLIENT_REGION))
            .build()
            .await;
        return Ok(loader.credentials_provider(provider).load().await);
    }

    match (&config.access_key, &config.secret_key) {
        (Some(access_key), Some(secret_key)) => {
            let credentials =
                Credentials::from_keys(access_key.as_str(), secret_key.as_str(), None);
            Ok(loader.credentials_provider(credentials).load().await)
        }
        _ => Err(WatcherError::InvalidAccount(format!(
            "account {} has neither a role ARN nor an access key/secret pair",
            config.label
        ))),
    }
}

fn sdk_error<E>(err: E) -> ApiError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ApiError(format!("{}", DisplayErrorContext(err)))
}

struct SdkObjectStore {
    client: aws_sdk_s3::Client,
}

#[async_trait]
impl ObjectStoreApi for SdkObjectStore {
    async fn list_buckets(&self) -> Result<Vec<String>, ApiError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    async fn bucket_location(&self, bucket: &str) -> Result<Option<String>, ApiError> {
        let output = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(sdk_error)?;
        // An empty location constraint means the legacy default region.
        Ok(output
            .location_constraint()
            .map(|constraint| constraint.as_str().to_string())
            .filter(|constraint| !constraint.is_empty()))
    }
}

struct SdkCertificates {
    clients: HashMap<String, aws_sdk_acm::Client>,
}

#[async_trait]
impl CertificateApi for SdkCertificates {
    async fn certificate_count(&self, region: &str) -> Result<usize, ApiError> {
        let client = self
            .clients
            .get(region)
            .ok_or_else(|| ApiError(format!("no acm client for region {region}")))?;
        let output = client
            .list_certificates()
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.certificate_summary_list().len())
    }
}

struct SdkEdge {
    client: aws_sdk_cloudfront::Client,
}

#[async_trait]
impl EdgeApi for SdkEdge {
    async fn distribution_count(&self) -> Result<usize, ApiError> {
        let output = self
            .client
            .list_distributions()
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output
            .distribution_list()
            .map(|list| list.items().len())
            .unwrap_or(0))
    }

    async fn origin_access_identity_count(&self) -> Result<usize, ApiError> {
        let output = self
            .client
            .list_cloud_front_origin_access_identities()
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output
            .cloud_front_origin_access_identity_list()
            .map(|list| list.items().len())
            .unwrap_or(0))
    }
}

struct SdkQuotas {
    clients: HashMap<String, aws_sdk_servicequotas::Client>,
}

impl SdkQuotas {
    fn client(&self, region: &str) -> Result<&aws_sdk_servicequotas::Client, ApiError> {
        self.clients
            .get(region)
            .ok_or_else(|| ApiError(format!("no service quotas client for region {region}")))
    }
}

#[async_trait]
impl QuotaApi for SdkQuotas {
    async fn approved_quota_changes(
        &self,
        region: &str,
        service_code: &str,
        quota_code: &str,
    ) -> Result<Vec<f64>, ApiError> {
        let output = self
            .client(region)?
            .list_requested_service_quota_change_history_by_quota()
            .service_code(service_code)
            .quota_code(quota_code)
            .status(RequestStatus::CaseClosed)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output
            .requested_quotas()
            .iter()
            .filter_map(|request| request.desired_value())
            .collect())
    }

    async fn default_quota(
        &self,
        region: &str,
        service_code: &str,
        quota_code: &str,
    ) -> Result<f64, ApiError> {
        let output = self
            .client(region)?
            .get_aws_default_service_quota()
            .service_code(service_code)
            .quota_code(quota_code)
            .send()
            .await
            .map_err(sdk_error)?;
        output
            .quota()
            .and_then(|quota| quota.value())
            .ok_or_else(|| ApiError("default quota response carried no value".to_string()))
    }
}

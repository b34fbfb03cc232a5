// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Trait seams over the upstream AWS APIs.
//!
//! Poll logic only ever sees these traits; the SDK-backed implementations
//! live in [`crate::clients`], and tests substitute in-memory fakes.

use async_trait::async_trait;

/// Error returned by any upstream API call. The message carries whatever
/// context the SDK produced; callers only log and count it.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ApiError(pub String);

/// Object-storage listing surface (S3).
#[async_trait]
pub trait ObjectStoreApi: Send + Sync {
    /// List every bucket name owned by the account. Not region-scoped.
    async fn list_buckets(&self) -> Result<Vec<String>, ApiError>;

    /// Resolve the region a bucket lives in. `None` means the API returned
    /// an empty location constraint, i.e. the legacy default region.
    async fn bucket_location(&self, bucket: &str) -> Result<Option<String>, ApiError>;
}

/// Certificate listing surface (ACM). Region-scoped by the API itself.
#[async_trait]
pub trait CertificateApi: Send + Sync {
    async fn certificate_count(&self, region: &str) -> Result<usize, ApiError>;
}

/// CDN listing surface (CloudFront). Global, not region-partitioned.
#[async_trait]
pub trait EdgeApi: Send + Sync {
    async fn distribution_count(&self) -> Result<usize, ApiError>;

    async fn origin_access_identity_count(&self) -> Result<usize, ApiError>;
}

/// Service Quotas surface.
#[async_trait]
pub trait QuotaApi: Send + Sync {
    /// Desired values of closed/approved quota change requests, in the
    /// API's natural return order.
    async fn approved_quota_changes(
        &self,
        region: &str,
        service_code: &str,
        quota_code: &str,
    ) -> Result<Vec<f64>, ApiError>;

    /// The platform-published default for a (service, quota) pair.
    async fn default_quota(
        &self,
        region: &str,
        service_code: &str,
        quota_code: &str,
    ) -> Result<f64, ApiError>;
}

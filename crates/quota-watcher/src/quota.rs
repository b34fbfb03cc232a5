// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Quota resolution with the approved-change-request / default fallback.

use crate::api::QuotaApi;
use crate::telemetry;
use std::sync::Arc;
use tracing::debug;

/// A (service, quota) pair as Service Quotas identifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSpec {
    pub service_code: &'static str,
    pub quota_code: &'static str,
}

/// Buckets per account.
pub const S3_BUCKET_QUOTA: QuotaSpec = QuotaSpec {
    service_code: "s3",
    quota_code: "L-DC2B2D3D",
};

/// ACM certificates per region.
pub const ACM_CERTIFICATE_QUOTA: QuotaSpec = QuotaSpec {
    service_code: "acm",
    quota_code: "L-F141DD1D",
};

/// CloudFront distributions per account.
pub const CLOUDFRONT_DISTRIBUTION_QUOTA: QuotaSpec = QuotaSpec {
    service_code: "cloudfront",
    quota_code: "L-24B04930",
};

/// CloudFront origin access identities per account.
pub const CLOUDFRONT_OAI_QUOTA: QuotaSpec = QuotaSpec {
    service_code: "cloudfront",
    quota_code: "L-08884E5C",
};

/// Service Quotas does not answer for the ACM quota in this region.
pub const CERTIFICATE_QUOTA_UNSUPPORTED_REGION: &str = "eu-north-1";

/// Limit published for the region above in place of a quota lookup.
pub const CERTIFICATE_QUOTA_PINNED_LIMIT: f64 = 2500.0;

/// Where a resolved limit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaSource {
    /// Desired value of the most recent approved change request.
    Approved,
    /// The service's published default.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedQuota {
    pub value: f64,
    pub source: QuotaSource,
}

/// Resolves limits against the Service Quotas API for one account.
pub struct QuotaResolver {
    api: Arc<dyn QuotaApi>,
}

impl QuotaResolver {
    pub fn new(api: Arc<dyn QuotaApi>) -> Self {
        QuotaResolver { api }
    }

    /// Resolve the applicable limit for `spec` in `region`.
    ///
    /// An approved change request wins over the default; when several
    /// approved requests exist the last entry in the API's return order is
    /// taken, never a re-sort by timestamp. Returns `None` when either
    /// lookup fails, leaving the previously published limit in place.
    pub async fn resolve(&self, region: &str, spec: &QuotaSpec) -> Option<ResolvedQuota> {
        if spec.quota_code == ACM_CERTIFICATE_QUOTA.quota_code
            && region == CERTIFICATE_QUOTA_UNSUPPORTED_REGION
        {
            return Some(ResolvedQuota {
                value: CERTIFICATE_QUOTA_PINNED_LIMIT,
                source: QuotaSource::Default,
            });
        }

        let history = telemetry::observe(
            "listQuotasHistory",
            self.api
                .approved_quota_changes(region, spec.service_code, spec.quota_code)
                .await,
        )?;

        if let Some(desired) = history.last() {
            debug!(
                region,
                service = spec.service_code,
                quota = spec.quota_code,
                limit = desired,
                "using approved quota change request"
            );
            return Some(ResolvedQuota {
                value: *desired,
                source: QuotaSource::Approved,
            });
        }

        let default = telemetry::observe(
            "getQuotasDefault",
            self.api
                .default_quota(region, spec.service_code, spec.quota_code)
                .await,
        )?;
        Some(ResolvedQuota {
            value: default,
            source: QuotaSource::Default,
        })
    }
}

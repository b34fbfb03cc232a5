// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One poll cycle per resource kind.
//!
//! Every cycle recomputes usage from scratch, resolves the matching quota,
//! and publishes (current, limit) together per labeled dimension. A failed
//! step only skips its own dimension; the gauges keep their previous
//! values until a later cycle overwrites them.

use crate::clients::ClientBundle;
use crate::quota::{
    QuotaResolver, ACM_CERTIFICATE_QUOTA, CLOUDFRONT_DISTRIBUTION_QUOTA, CLOUDFRONT_OAI_QUOTA,
    S3_BUCKET_QUOTA,
};
use crate::region;
use crate::telemetry;
use crate::usage;
use std::sync::Arc;
use tracing::debug;

/// The resource kinds the exporter polls, each on its own schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buckets,
    Certificates,
    Distributions,
    OriginAccessIdentities,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Buckets,
        ResourceKind::Certificates,
        ResourceKind::Distributions,
        ResourceKind::OriginAccessIdentities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Buckets => "buckets",
            ResourceKind::Certificates => "certificates",
            ResourceKind::Distributions => "distributions",
            ResourceKind::OriginAccessIdentities => "origin_access_identities",
        }
    }
}

/// Run one cycle of `kind` against the given client bundle.
pub async fn run_cycle(kind: ResourceKind, bundle: &ClientBundle) {
    debug!(account = %bundle.account, kind = kind.as_str(), "poll cycle started");
    match kind {
        ResourceKind::Buckets => poll_buckets(bundle).await,
        ResourceKind::Certificates => poll_certificates(bundle).await,
        ResourceKind::Distributions => poll_distributions(bundle).await,
        ResourceKind::OriginAccessIdentities => poll_origin_access_identities(bundle).await,
    }
    debug!(account = %bundle.account, kind = kind.as_str(), "poll cycle finished");
}

async fn poll_buckets(bundle: &ClientBundle) {
    let Some(counts) = usage::count_buckets_by_region(Arc::clone(&bundle.object_store)).await
    else {
        return;
    };

    let resolver = QuotaResolver::new(Arc::clone(&bundle.quotas));
    for region in region::TRACKED_REGIONS.iter().copied() {
        let Some(quota) = resolver.resolve(region, &S3_BUCKET_QUOTA).await else {
            continue;
        };
        let current = counts.get(region).copied().unwrap_or(0);
        telemetry::BUCKETS_CURRENT
            .with_label_values(&[&bundle.account, region])
            .set(current as f64);
        telemetry::BUCKETS_LIMIT
            .with_label_values(&[&bundle.account, region])
            .set(quota.value);
    }
}

async fn poll_certificates(bundle: &ClientBundle) {
    let resolver = QuotaResolver::new(Arc::clone(&bundle.quotas));
    for region in region::TRACKED_REGIONS.iter().copied() {
        let Some(count) = telemetry::observe(
            "ListCertificates",
            bundle.certificates.certificate_count(region).await,
        ) else {
            continue;
        };
        let Some(quota) = resolver.resolve(region, &ACM_CERTIFICATE_QUOTA).await else {
            continue;
        };
        telemetry::CERTIFICATES_CURRENT
            .with_label_values(&[&bundle.account, region])
            .set(count as f64);
        telemetry::CERTIFICATES_LIMIT
            .with_label_values(&[&bundle.account, region])
            .set(quota.value);
    }
}

async fn poll_distributions(bundle: &ClientBundle) {
    let Some(count) = telemetry::observe(
        "listDistributions",
        bundle.edge.distribution_count().await,
    ) else {
        return;
    };

    let resolver = QuotaResolver::new(Arc::clone(&bundle.quotas));
    let Some(quota) = resolver
        .resolve(region::quota_home_region(), &CLOUDFRONT_DISTRIBUTION_QUOTA)
        .await
    else {
        return;
    };
    telemetry::DISTRIBUTIONS_CURRENT
        .with_label_values(&[&bundle.account])
        .set(count as f64);
    telemetry::DISTRIBUTIONS_LIMIT
        .with_label_values(&[&bundle.account])
        .set(quota.value);
}

async fn poll_origin_access_identities(bundle: &ClientBundle) {
    let Some(count) = telemetry::observe(
        "listOAI",
        bundle.edge.origin_access_identity_count().await,
    ) else {
        return;
    };

    let resolver = QuotaResolver::new(Arc::clone(&bundle.quotas));
    let Some(quota) = resolver
        .resolve(region::quota_home_region(), &CLOUDFRONT_OAI_QUOTA)
        .await
    else {
        return;
    };
    telemetry::ORIGIN_ACCESS_IDENTITIES_CURRENT
        .with_label_values(&[&bundle.account])
        .set(count as f64);
    telemetry::ORIGIN_ACCESS_IDENTITIES_LIMIT
        .with_label_values(&[&bundle.account])
        .set(quota.value);
}

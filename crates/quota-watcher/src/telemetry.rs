// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metric definitions and call accounting.
//!
//! Metric names are part of the exporter's contract; dashboards and alerts
//! key on them. The misspelling in the origin-access-identity gauges is
//! load-bearing for existing dashboards and must not be fixed here.

use crate::api::ApiError;
use prometheus::{
    register_gauge_vec, register_int_counter_vec, GaugeVec, IntCounterVec,
};
use std::sync::LazyLock;
use tracing::warn;

/// Total upstream AWS API calls, labeled by operation.
pub static AWS_API_CALLS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "total_aws_api_call_count",
        "Total aws api call count",
        &["api"]
    )
    .expect("metric registration")
});

/// Failed upstream AWS API calls, labeled by operation.
pub static AWS_API_CALL_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "total_aws_api_call_failed_count",
        "Total aws api call failed count",
        &["api"]
    )
    .expect("metric registration")
});

pub static BUCKETS_CURRENT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_buckets_usage_per_region_current",
        "Total buckets usage per region current",
        &["account", "region"]
    )
    .expect("metric registration")
});

pub static BUCKETS_LIMIT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_buckets_usage_per_region_limited",
        "Total buckets usage per region limited",
        &["account", "region"]
    )
    .expect("metric registration")
});

pub static CERTIFICATES_CURRENT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_certificates_usage_per_region_current",
        "Total certificates usage per region current",
        &["account", "region"]
    )
    .expect("metric registration")
});

pub static CERTIFICATES_LIMIT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_certificates_usage_per_region_limited",
        "Total certificates usage per region limited",
        &["account", "region"]
    )
    .expect("metric registration")
});

pub static DISTRIBUTIONS_CURRENT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_cloudfront_distributions_usage_current",
        "Total cloudfront distributions usage current",
        &["account"]
    )
    .expect("metric registration")
});

pub static DISTRIBUTIONS_LIMIT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_cloudfront_distributions_usage_limited",
        "Total cloudfront distributions usage limited",
        &["account"]
    )
    .expect("metric registration")
});

pub static ORIGIN_ACCESS_IDENTITIES_CURRENT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_cloudfront_origin_access_identifies_usage_current",
        "Total cloudfront origin access identifies usage current",
        &["account"]
    )
    .expect("metric registration")
});

pub static ORIGIN_ACCESS_IDENTITIES_LIMIT: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        "total_cloudfront_origin_access_identifies_usage_limited",
        "Total cloudfront origin access identifies usage limited",
        &["account"]
    )
    .expect("metric registration")
});

/// Record one upstream call attempt and unwrap its result.
///
/// Increments the call counter for `api`, and on failure increments the
/// failure counter, logs, and returns `None` so the caller can skip the
/// affected region or item without aborting the rest of the cycle.
pub fn observe<T>(api: &str, result: Result<T, ApiError>) -> Option<T> {
    AWS_API_CALLS.with_label_values(&[api]).inc();
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            AWS_API_CALL_FAILURES.with_label_values(&[api]).inc();
            warn!(api, error = %err, "aws api call failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_observe_success_counts_call_only() {
        let calls = AWS_API_CALLS.with_label_values(&["testOp"]).get();
        let failures = AWS_API_CALL_FAILURES.with_label_values(&["testOp"]).get();

        let out = observe("testOp", Ok::<_, ApiError>(7));
        assert_eq!(out, Some(7));
        assert_eq!(AWS_API_CALLS.with_label_values(&["testOp"]).get(), calls + 1);
        assert_eq!(
            AWS_API_CALL_FAILURES.with_label_values(&["testOp"]).get(),
            failures
        );
    }

    #[test]
    #[serial]
    fn test_observe_failure_counts_both() {
        let calls = AWS_API_CALLS.with_label_values(&["testOp"]).get();
        let failures = AWS_API_CALL_FAILURES.with_label_values(&["testOp"]).get();

        let out = observe::<u64>("testOp", Err(ApiError("boom".to_string())));
        assert_eq!(out, None);
        assert_eq!(AWS_API_CALLS.with_label_values(&["testOp"]).get(), calls + 1);
        assert_eq!(
            AWS_API_CALL_FAILURES.with_label_values(&["testOp"]).get(),
            failures + 1
        );
    }

    #[test]
    fn test_gauge_names_are_stable() {
        // The exposition names are a contract with existing dashboards.
        BUCKETS_CURRENT.with_label_values(&["contract", "us-east-1"]).set(1.0);
        ORIGIN_ACCESS_IDENTITIES_CURRENT
            .with_label_values(&["contract"])
            .set(1.0);

        let names: Vec<String> = prometheus::gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"total_buckets_usage_per_region_current".to_string()));
        assert!(names
            .contains(&"total_cloudfront_origin_access_identifies_usage_current".to_string()));
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-region bucket counting.
//!
//! ListBuckets is global, so the region of every bucket has to be resolved
//! with one GetBucketLocation call each. Lookups run concurrently and feed
//! a count map scoped to the cycle; the map is complete only once every
//! lookup has finished or failed.

use crate::api::ObjectStoreApi;
use crate::region;
use crate::telemetry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::error;

/// Count map seeded with zero for every tracked region, so a region with
/// no resources still publishes an explicit 0.
fn seed_region_counts() -> HashMap<String, u64> {
    region::TRACKED_REGIONS
        .iter()
        .map(|region| (region.to_string(), 0))
        .collect()
}

/// Count the account's buckets per region.
///
/// Returns `None` when the listing call itself fails; the cycle is then
/// abandoned and previously published values stay put. Individual location
/// lookups that fail are counted as API failures and contribute nothing.
pub async fn count_buckets_by_region(
    api: Arc<dyn ObjectStoreApi>,
) -> Option<HashMap<String, u64>> {
    let buckets = telemetry::observe("listBuckets", api.list_buckets().await)?;

    let counts = Arc::new(Mutex::new(seed_region_counts()));
    let mut lookups = JoinSet::new();

    for bucket in buckets {
        let api = Arc::clone(&api);
        let counts = Arc::clone(&counts);
        lookups.spawn(async move {
            let Some(location) =
                telemetry::observe("getLocation", api.bucket_location(&bucket).await)
            else {
                return;
            };
            let resolved =
                location.unwrap_or_else(|| region::LEGACY_BUCKET_REGION.to_string());

            #[allow(clippy::expect_used)]
            let mut counts = counts.lock().expect("lock poisoned");
            *counts.entry(resolved).or_insert(0) += 1;
        });
    }

    // Join barrier: the quota comparison downstream needs final counts.
    while let Some(joined) = lookups.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "bucket location task panicked");
        }
    }

    #[allow(clippy::expect_used)]
    let counts = counts.lock().expect("lock poisoned").clone();
    Some(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use async_trait::async_trait;
    use serial_test::serial;
    use std::time::Duration;

    /// In-memory bucket set with per-bucket scripted locations.
    /// `None` location = empty constraint, `Some(Err)` = lookup failure.
    struct FakeObjectStore {
        buckets: Vec<(String, Result<Option<String>, ()>)>,
        lookup_delay: Duration,
        fail_listing: bool,
    }

    impl FakeObjectStore {
        fn with_buckets(buckets: Vec<(&str, Result<Option<&str>, ()>)>) -> Arc<Self> {
            Arc::new(FakeObjectStore {
                buckets: buckets
                    .into_iter()
                    .map(|(name, loc)| {
                        (
                            name.to_string(),
                            loc.map(|inner| inner.map(str::to_string)),
                        )
                    })
                    .collect(),
                lookup_delay: Duration::ZERO,
                fail_listing: false,
            })
        }
    }

    #[async_trait]
    impl ObjectStoreApi for FakeObjectStore {
        async fn list_buckets(&self) -> Result<Vec<String>, ApiError> {
            if self.fail_listing {
                return Err(ApiError("listing failed".to_string()));
            }
            Ok(self.buckets.iter().map(|(name, _)| name.clone()).collect())
        }

        async fn bucket_location(&self, bucket: &str) -> Result<Option<String>, ApiError> {
            if !self.lookup_delay.is_zero() {
                tokio::time::sleep(self.lookup_delay).await;
            }
            self.buckets
                .iter()
                .find(|(name, _)| name == bucket)
                .map(|(_, location)| {
                    location
                        .clone()
                        .map_err(|()| ApiError(format!("lookup failed for {bucket}")))
                })
                .unwrap_or_else(|| Err(ApiError(format!("unknown bucket {bucket}"))))
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_counts_match_manual_tally() {
        let api = FakeObjectStore::with_buckets(vec![
            ("a", Ok(None)),
            ("b", Ok(None)),
            ("c", Ok(Some("eu-west-1"))),
        ]);

        let counts = count_buckets_by_region(api).await.expect("count failed");

        assert_eq!(counts["us-east-1"], 2);
        assert_eq!(counts["eu-west-1"], 1);
        for region in region::TRACKED_REGIONS {
            if *region != "us-east-1" && *region != "eu-west-1" {
                assert_eq!(counts[*region], 0, "expected zero in {region}");
            }
        }
        assert_eq!(counts.values().sum::<u64>(), 3);
    }

    #[tokio::test]
    #[serial]
    async fn test_every_tracked_region_is_present_even_with_no_buckets() {
        let api = FakeObjectStore::with_buckets(vec![]);

        let counts = count_buckets_by_region(api).await.expect("count failed");

        assert_eq!(counts.len(), region::TRACKED_REGIONS.len());
        assert!(counts.values().all(|count| *count == 0));
    }

    #[tokio::test]
    #[serial]
    async fn test_listing_failure_abandons_the_cycle() {
        let api = Arc::new(FakeObjectStore {
            buckets: vec![],
            lookup_delay: Duration::ZERO,
            fail_listing: true,
        });

        assert!(count_buckets_by_region(api).await.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_failed_lookup_skips_item_and_counts_one_failure() {
        let failures_before = telemetry::AWS_API_CALL_FAILURES
            .with_label_values(&["getLocation"])
            .get();

        let api = FakeObjectStore::with_buckets(vec![
            ("good", Ok(Some("eu-central-1"))),
            ("bad", Err(())),
            ("also-good", Ok(None)),
        ]);

        let counts = count_buckets_by_region(api).await.expect("count failed");

        assert_eq!(counts["eu-central-1"], 1);
        assert_eq!(counts["us-east-1"], 1);
        assert_eq!(counts.values().sum::<u64>(), 2);
        assert_eq!(
            telemetry::AWS_API_CALL_FAILURES
                .with_label_values(&["getLocation"])
                .get(),
            failures_before + 1
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_concurrent_increments_lose_no_updates() {
        let buckets: Vec<(String, Result<Option<String>, ()>)> = (0..200)
            .map(|i| {
                let region = region::TRACKED_REGIONS[i % region::TRACKED_REGIONS.len()];
                (format!("bucket-{i}"), Ok(Some(region.to_string())))
            })
            .collect();
        let api = Arc::new(FakeObjectStore {
            buckets,
            lookup_delay: Duration::from_millis(1),
            fail_listing: false,
        });

        let counts = count_buckets_by_region(api).await.expect("count failed");

        assert_eq!(counts.values().sum::<u64>(), 200);
    }

    #[tokio::test]
    #[serial]
    async fn test_untracked_location_still_counts_into_its_own_key() {
        let api = FakeObjectStore::with_buckets(vec![("x", Ok(Some("af-south-1")))]);

        let counts = count_buckets_by_region(api).await.expect("count failed");

        assert_eq!(counts["af-south-1"], 1);
        assert_eq!(counts["us-east-1"], 0);
    }
}

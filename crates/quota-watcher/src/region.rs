// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hand-maintained region allow-list.
//!
//! Regions are deliberately opt-in: commented entries are either not enabled
//! for the monitored accounts or not reachable with the exporter's
//! credentials. New regions are added here without touching poll logic.

/// Regions the exporter polls. Keep alphabetical.
pub const TRACKED_REGIONS: &[&str] = &[
    //"af-south-1",
    //"ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    //"ap-southeast-3",
    "ca-central-1",
    "eu-central-1",
    "eu-north-1",
    //"eu-south-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    //"me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    //"us-gov-east-1",
    //"us-gov-west-1",
    "us-west-1",
    "us-west-2",
];

/// Region from which CloudFront quotas must be queried.
pub const QUOTA_HOME_REGION: &str = "us-east-1";

/// Region a bucket lives in when GetBucketLocation returns an empty
/// location constraint.
pub const LEGACY_BUCKET_REGION: &str = "us-east-1";

/// Index used when the quota home region is missing from the allow-list.
const QUOTA_HOME_FALLBACK_INDEX: usize = 13;

/// Resolve the quota home region against the allow-list, falling back to a
/// fixed index if it was commented out.
pub fn quota_home_region() -> &'static str {
    TRACKED_REGIONS
        .iter()
        .find(|region| **region == QUOTA_HOME_REGION)
        .copied()
        .unwrap_or(TRACKED_REGIONS[QUOTA_HOME_FALLBACK_INDEX])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_home_region_is_tracked() {
        assert_eq!(quota_home_region(), "us-east-1");
        assert!(TRACKED_REGIONS.contains(&quota_home_region()));
    }

    #[test]
    fn test_fallback_index_in_bounds() {
        assert!(QUOTA_HOME_FALLBACK_INDEX < TRACKED_REGIONS.len());
    }

    #[test]
    fn test_no_duplicate_regions() {
        let mut seen = std::collections::HashSet::new();
        for region in TRACKED_REGIONS {
            assert!(seen.insert(region), "duplicate region {region}");
        }
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Core poller reconciling AWS resource usage against AWS Service Quotas.
//!
//! The library fans one poll loop out per (account, resource kind) pair,
//! counts the tracked resources (S3 buckets by region, ACM certificates by
//! region, CloudFront distributions and origin access identities globally),
//! resolves the applicable quota for each dimension, and publishes the
//! (current, limit) pairs as Prometheus gauges.
//!
//! The binary crate (`quota-exporter`) owns configuration loading and the
//! `/metrics` exposition endpoint; everything upstream of the gauges lives
//! here.

pub mod api;
pub mod clients;
pub mod error;
pub mod poller;
pub mod quota;
pub mod region;
pub mod scheduler;
pub mod telemetry;
pub mod usage;

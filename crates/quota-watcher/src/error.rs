// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while constructing account client bundles.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("invalid account configuration: {0}")]
    InvalidAccount(String),

    #[error("failed to build AWS clients: {0}")]
    ClientSetup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatcherError::InvalidAccount("missing credentials".to_string());
        assert_eq!(
            err.to_string(),
            "invalid account configuration: missing credentials"
        );
    }
}

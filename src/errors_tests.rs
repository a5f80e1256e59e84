// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for error types.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::errors::*;
    use crate::records::{Action, Change, RecordType};

    fn change(values: usize) -> Change {
        Change {
            action: Action::Create,
            name: "big.zs.example.com.".to_string(),
            record_type: RecordType::TXT,
            ttl: 60,
            values: (0..values).map(|i| format!("v{i}")).collect(),
            weight: None,
            set_identifier: None,
            health_check_id: None,
        }
    }

    #[test]
    fn test_no_matching_zone_error() {
        let error = SyncError::NoMatchingZone {
            root: "zs.example.com.".to_string(),
            available: "example.org.".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "No hosted zone covers root domain 'zs.example.com.' (zones: example.org.)"
        );
    }

    #[test]
    fn test_oversized_change_error() {
        let error = SyncError::oversized(&change(3));

        assert_eq!(
            error.to_string(),
            "Change for 'big.zs.example.com.' exceeds per-request quota (3 values, 6 characters)"
        );
    }

    #[test]
    fn test_apply_chunk_error_carries_chunk() {
        let error = SyncError::ApplyChunk {
            zone_id: "Z1".to_string(),
            index: 2,
            chunk: vec![change(1), change(1)],
            reason: "record exists".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Zone 'Z1' rejected chunk 2 (2 changes): record exists"
        );
        if let SyncError::ApplyChunk { chunk, .. } = error {
            assert_eq!(chunk.len(), 2);
        }
    }

    #[test]
    fn test_malformed_snapshot_error() {
        let error = SnapshotError::MalformedSnapshot {
            path: "snap.yaml".to_string(),
            field: "suffix",
        };

        assert_eq!(
            error.to_string(),
            "Malformed snapshot snap.yaml: missing field 'suffix'"
        );
    }

    #[test]
    fn test_resolution_timeout_error() {
        let error = ResolveError::ResolutionTimeout {
            name: "web.zs.example.com.".to_string(),
            record_type: "TXT".to_string(),
            timeout: Duration::from_secs(5),
        };

        assert_eq!(
            error.to_string(),
            "Query for 'web.zs.example.com.' TXT timed out after 5s"
        );
    }

    #[test]
    fn test_hop_limit_error() {
        let error = ResolveError::HopLimitExceeded {
            name: "loop.".to_string(),
            max_hops: 16,
        };

        assert_eq!(error.to_string(), "Resolution of 'loop.' exceeded 16 hops");
    }
}

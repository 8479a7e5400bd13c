//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible room states during development.
//! These checks are compiled out in release builds.

use crate::hosting::SessionRegistry;
use crate::models::PlaybackCursor;

/// Validate that the registry's host is consistent with its connections
pub fn assert_registry_invariants(registry: &SessionRegistry) {
    // The host must be a connected participant
    if let Some(host) = registry.host() {
        debug_assert!(
            registry.contains(host),
            "Host {} is not among connected participants",
            host
        );
    }

    // No participant may appear twice in the join order
    let participants = registry.participants();
    for (i, p) in participants.iter().enumerate() {
        debug_assert!(
            !participants[i + 1..].contains(p),
            "Participant {} registered twice",
            p
        );
    }

    // An epoch of 0 means no host was ever assigned
    debug_assert!(
        !(registry.election_epoch() == 0 && registry.host().is_some()),
        "Registry has host {:?} but epoch is 0",
        registry.host()
    );
}

/// Validate that a cursor points inside a playlist of `len` entries
pub fn assert_cursor_invariants(cursor: &PlaybackCursor, len: usize) {
    debug_assert!(
        cursor.is_valid_for(len),
        "Cursor index {:?} is invalid for playlist of {} entries",
        cursor.index,
        len
    );

    debug_assert!(
        cursor.index.is_none() || cursor.started_at.is_some(),
        "Cursor at {:?} has no start time",
        cursor.index
    );
}

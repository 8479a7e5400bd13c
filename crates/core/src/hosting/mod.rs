//! Session registry and host election for the room
//!
//! The host is the participant allowed to advance playback. Election is
//! "first surviving connection": no consensus is needed because a single
//! coordinator owns the registry.

use tracing::{debug, info};

use crate::invariants::assert_registry_invariants;
use crate::models::{ParticipantId, Role};

/// Result of registering a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// Role of the participant that just connected
    pub role: Role,
    /// Participant that was just made host and must be notified
    pub promoted: Option<ParticipantId>,
}

/// Connected participants in join order, plus the current host
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    connections: Vec<ParticipantId>,
    host_id: Option<ParticipantId>,
    /// Incremented on every host change
    election_epoch: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant.
    ///
    /// When the room has no host and this join brings it to two or more
    /// participants, the earliest-joined participant becomes host.
    pub fn on_connect(&mut self, participant: ParticipantId) -> ConnectOutcome {
        if self.contains(participant) {
            debug!(participant = %participant, "Participant already registered");
            return ConnectOutcome {
                role: self.role_of(participant).unwrap_or(Role::Member),
                promoted: None,
            };
        }

        self.connections.push(participant);

        let promoted = if self.host_id.is_none() && self.connections.len() >= 2 {
            let first = self.connections[0];
            self.assign_host(Some(first));
            Some(first)
        } else {
            None
        };

        assert_registry_invariants(self);

        ConnectOutcome {
            role: self.role_of(participant).unwrap_or(Role::Member),
            promoted,
        }
    }

    /// Deregister a participant.
    ///
    /// Returns the newly promoted host if the departing participant held
    /// the role and anyone remains.
    pub fn on_disconnect(&mut self, participant: ParticipantId) -> Option<ParticipantId> {
        let Some(position) = self.connections.iter().position(|p| *p == participant) else {
            debug!(participant = %participant, "Disconnect for unknown participant");
            return None;
        };
        self.connections.remove(position);

        let promoted = if self.host_id == Some(participant) {
            let next = self.connections.first().copied();
            self.assign_host(next);
            next
        } else {
            None
        };

        assert_registry_invariants(self);
        promoted
    }

    fn assign_host(&mut self, host: Option<ParticipantId>) {
        self.host_id = host;
        self.election_epoch += 1;
        match host {
            Some(host) => info!(host = %host, epoch = self.election_epoch, "Host assigned"),
            None => info!(epoch = self.election_epoch, "Host cleared"),
        }
    }

    /// Current host, if any
    pub fn host(&self) -> Option<ParticipantId> {
        self.host_id
    }

    /// Check if a participant is currently the host
    pub fn is_host(&self, participant: ParticipantId) -> bool {
        self.host_id == Some(participant)
    }

    /// Role of a connected participant, `None` if not connected
    pub fn role_of(&self, participant: ParticipantId) -> Option<Role> {
        if !self.contains(participant) {
            return None;
        }
        Some(if self.is_host(participant) {
            Role::Host
        } else {
            Role::Member
        })
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.connections.contains(&participant)
    }

    /// Connected participants in join order
    pub fn participants(&self) -> &[ParticipantId] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn election_epoch(&self) -> u64 {
        self.election_epoch
    }
}

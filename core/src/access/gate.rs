use std::collections::HashSet;

use tracing::{debug, info};

use super::PasswordVerifier;
use crate::model::{Album, AlbumId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Delete,
}

/// An action on an album, waiting for or cleared by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub album: Album,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Idle,
    /// Waiting for the album's password, the action is deferred
    Challenging(Pending),
    /// The action may be carried out, see [`AccessGate::take_grant`]
    Granted(Pending),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("incorrect password")]
    WrongPassword,
    #[error("password can not be empty")]
    EmptyPassword,
    #[error("no password prompt is open")]
    NoChallenge,
    #[error("album {} is locked, open it with its password first", .0.as_str())]
    Locked(AlbumId),
}

/// Decides whether actions on locked albums need a password first.
///
/// Albums unlocked once stay unlocked for the lifetime of the gate, no matter
/// which action triggered the unlock.
#[derive(Debug, Default)]
pub struct AccessGate {
    unlocked: HashSet<AlbumId>,
    state: GateState,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_unlocked(&self, id: &AlbumId) -> bool {
        self.unlocked.contains(id)
    }

    pub fn needs_password(&self, album: &Album) -> bool {
        album.is_locked && !self.unlocked.contains(&album.id)
    }

    /// Fails with the first album in `chain` that is still locked
    pub fn check<'a>(&self, chain: impl IntoIterator<Item = &'a Album>) -> Result<(), AccessError> {
        match chain.into_iter().find(|album| self.needs_password(album)) {
            Some(album) => {
                debug!(album_id = %album.id, "refusing access to locked album");
                Err(AccessError::Locked(album.id.clone()))
            }
            None => Ok(()),
        }
    }

    /// Requests `action` on `album`. Any open challenge is superseded.
    pub fn request(&mut self, album: &Album, action: Action) -> &GateState {
        let pending = Pending {
            album: album.clone(),
            action,
        };
        self.state = if self.needs_password(album) {
            debug!(album_id = %album.id, %action, "album is locked, asking for password");
            GateState::Challenging(pending)
        } else {
            GateState::Granted(pending)
        };
        &self.state
    }

    /// Checks `candidate` against the challenged album's password hash.
    /// On success the album is unlocked for the session and the deferred action granted.
    pub fn submit(
        &mut self,
        candidate: &str,
        verifier: &impl PasswordVerifier,
    ) -> Result<Pending, AccessError> {
        let GateState::Challenging(pending) = &self.state else {
            return Err(AccessError::NoChallenge);
        };
        if candidate.is_empty() {
            return Err(AccessError::EmptyPassword);
        }
        let verified = pending
            .album
            .lock_hash()
            .is_some_and(|digest| verifier.verify(candidate, digest));
        if !verified {
            info!(album_id = %pending.album.id, "incorrect password");
            return Err(AccessError::WrongPassword);
        }
        let pending = pending.clone();
        info!(album_id = %pending.album.id, "album unlocked");
        self.unlocked.insert(pending.album.id.clone());
        self.state = GateState::Granted(pending.clone());
        Ok(pending)
    }

    /// Abandons an open challenge and returns the discarded action
    pub fn cancel(&mut self) -> Option<Pending> {
        match std::mem::take(&mut self.state) {
            GateState::Challenging(pending) => Some(pending),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Takes a granted action for execution, returning the gate to idle
    pub fn take_grant(&mut self) -> Option<Pending> {
        match std::mem::take(&mut self.state) {
            GateState::Granted(pending) => Some(pending),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Drops `id` from the unlocked set, e.g. after the album was deleted
    pub fn forget(&mut self, id: &AlbumId) {
        self.unlocked.remove(id);
    }
}

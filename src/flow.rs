use bevy::prelude::*;

use crate::error::DemoError;

/// Where the room is in its load → split → reveal → ghost lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RevealStage {
    #[default]
    Unloaded,
    Loaded,
    Split,
    FakeRevealed,
    GhostActive,
    GhostRemoved,
}

impl RevealStage {
    fn successor(self) -> Option<Self> {
        match self {
            Self::Unloaded => Some(Self::Loaded),
            Self::Loaded => Some(Self::Split),
            Self::Split => Some(Self::FakeRevealed),
            Self::FakeRevealed => Some(Self::GhostActive),
            Self::GhostActive => Some(Self::GhostRemoved),
            Self::GhostRemoved => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unloaded => "waiting for room",
            Self::Loaded => "room loaded",
            Self::Split => "room split, fake hidden among parts",
            Self::FakeRevealed => "fake part revealed",
            Self::GhostActive => "ghost rising",
            Self::GhostRemoved => "ghost gone",
        }
    }
}

/// Single owner of the reveal sequence. Each edge has its own method so the
/// caller states which transition it means; anything else is rejected and
/// leaves the stage untouched.
#[derive(Resource, Debug, Default)]
pub struct RevealFlow {
    stage: RevealStage,
}

impl RevealFlow {
    pub fn stage(&self) -> RevealStage {
        self.stage
    }

    pub fn is_split(&self) -> bool {
        self.stage >= RevealStage::Split
    }

    fn advance(&mut self, to: RevealStage) -> Result<(), DemoError> {
        if self.stage.successor() != Some(to) {
            return Err(DemoError::IllegalTransition {
                from: self.stage,
                to,
            });
        }
        debug!("[flow] {:?} -> {:?}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Model finished loading. Re-entering `Loaded` is allowed while the room
    /// is still unsplit (a split that found no meshes can be retried).
    pub fn model_loaded(&mut self) -> Result<(), DemoError> {
        if self.stage == RevealStage::Loaded {
            return Ok(());
        }
        self.advance(RevealStage::Loaded)
    }

    pub fn room_split(&mut self) -> Result<(), DemoError> {
        self.advance(RevealStage::Split)
    }

    pub fn fake_revealed(&mut self) -> Result<(), DemoError> {
        self.advance(RevealStage::FakeRevealed)
    }

    pub fn ghost_spawned(&mut self) -> Result<(), DemoError> {
        self.advance(RevealStage::GhostActive)
    }

    pub fn ghost_removed(&mut self) -> Result<(), DemoError> {
        self.advance(RevealStage::GhostRemoved)
    }
}

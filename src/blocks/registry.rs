//! Block factory
//!
//! The palette and the undo of a delete both need to build blocks from their
//! persisted name. [`BlockRegistry`] maps each name to a constructor; it is
//! filled once at start-up by [`BlockRegistry::standard`].

use super::opcode::Opcode;
use crate::arrangement::Element;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Why blocks are being created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Dropped from the palette: compound blocks come with their end marker
    Palette,
    /// Rebuilt from history: exactly the named element
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no block named '{0}' is registered")]
    UnknownBlock(String),
}

type Constructor = fn(Origin) -> Vec<Element>;

/// Name-keyed block factory
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    constructors: FxHashMap<&'static str, Constructor>,
    /// Insertion order, for a stable palette
    order: Vec<&'static str>,
}

macro_rules! constructor {
    ($op:expr) => {
        |origin: Origin| -> Vec<Element> {
            let head = Element::fresh($op);
            match ($op.closing(), origin) {
                (Some(end), Origin::Palette) => vec![head, Element::fresh(end)],
                _ => vec![head],
            }
        }
    };
}

impl BlockRegistry {
    /// An empty registry; see [`standard`](Self::standard)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every catalogue block
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Opcode::SetMotorSpeed.name(), constructor!(Opcode::SetMotorSpeed));
        registry.register(Opcode::ForwardFor.name(), constructor!(Opcode::ForwardFor));
        registry.register(Opcode::BackwardFor.name(), constructor!(Opcode::BackwardFor));
        registry.register(Opcode::TurnLeftFor.name(), constructor!(Opcode::TurnLeftFor));
        registry.register(Opcode::TurnRightFor.name(), constructor!(Opcode::TurnRightFor));
        registry.register(Opcode::WaitFor.name(), constructor!(Opcode::WaitFor));
        registry.register(Opcode::StopMotors.name(), constructor!(Opcode::StopMotors));
        registry.register(Opcode::Break.name(), constructor!(Opcode::Break));
        registry.register(Opcode::IfTouched.name(), constructor!(Opcode::IfTouched));
        registry.register(Opcode::IfReleased.name(), constructor!(Opcode::IfReleased));
        registry.register(
            Opcode::IfObstacleCloser.name(),
            constructor!(Opcode::IfObstacleCloser),
        );
        registry.register(Opcode::IfDarkerThan.name(), constructor!(Opcode::IfDarkerThan));
        registry.register(Opcode::RepeatTimes.name(), constructor!(Opcode::RepeatTimes));
        registry.register(Opcode::RepeatForever.name(), constructor!(Opcode::RepeatForever));
        registry.register(Opcode::EndIf.name(), constructor!(Opcode::EndIf));
        registry.register(Opcode::EndRepeat.name(), constructor!(Opcode::EndRepeat));
        registry
    }

    /// Add or replace the constructor for `name`
    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        if self.constructors.insert(name, constructor).is_none() {
            self.order.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Build the blocks registered under `name`
    pub fn create_blocks(&self, origin: Origin, name: &str) -> Result<Vec<Element>, RegistryError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| RegistryError::UnknownBlock(name.to_string()))?;
        Ok(constructor(origin))
    }

    /// Names a user can drop from the palette (end markers excluded)
    pub fn palette(&self) -> Vec<&'static str> {
        self.order
            .iter()
            .copied()
            .filter(|name| {
                Opcode::from_name(name)
                    .map(|op| op.kind() != super::opcode::BlockKind::End)
                    .unwrap_or(true)
            })
            .collect()
    }
}

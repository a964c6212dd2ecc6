//! Block model
//!
//! - [`opcode`]: the catalogue of block types, their kinds and parameters
//! - [`model`]: the program tree the interpreter walks
//! - [`registry`]: name-keyed factory used by the palette and by undo
//!
//! # Block kinds
//!
//! Every block is a sequence (one device action), a selection (condition plus
//! body) or a repetition (bounded or unbounded loop plus body). Break is a
//! sequence block that performs no device action and only signals the
//! enclosing loop.

pub mod model;
pub mod opcode;
pub mod registry;

pub use model::{
    Node, Parameterized, Program, Repeat, RepetitionBlock, SelectionBlock, SequenceBlock,
};
pub use opcode::{BlockKind, Opcode, ParameterSpec, Unit};
pub use registry::{BlockRegistry, Origin, RegistryError};

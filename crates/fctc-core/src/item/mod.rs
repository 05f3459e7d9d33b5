//! Item model
//!
//! Every item, tool and raw material is an [`ItemNode`] keyed by name. Composite
//! nodes carry an ordered list of [`Step`]s naming the tools and raw materials
//! each step needs.

mod node;
mod status;

pub use node::{ItemNode, Step};
pub use status::ItemStatus;

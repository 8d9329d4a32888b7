//! Data model and math shared by the modforge editor and runtime.
//!
//! Nothing in this crate touches the scene graph; it only knows how to read
//! and write mod content and how to answer geometric questions about it.

pub mod components;
pub mod events;
pub mod gizmo;
pub mod level;
pub mod math;
pub mod mesh;
pub mod objects;
pub mod schema;

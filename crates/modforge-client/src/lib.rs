//! modforge client: turns mod content into live scene graphs.
//!
//! Resources are loaded from a mod's `objects/` directory, definitions are
//! instantiated into [`node::Node`] templates and spawned into a hecs world.
//! The editor and the game session both build on that.

pub mod camera;
pub mod cli;
pub mod config;
pub mod editor;
pub mod instantiate;
pub mod mod_registry;
pub mod node;
pub mod physics;
pub mod resources;
pub mod scripting;
pub mod services;
pub mod session;
pub mod transform;
pub mod world;

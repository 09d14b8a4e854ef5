//! G'day, and welcome to the Hotham authority core! 👋
//!
//! This crate keeps a group of peers in agreement about who is allowed to simulate each shared
//! entity, and builds grabbing on top of that. Every change goes through the
//! [`contexts::ActionBus`] as an [`action::Action`]; receptors fold applied actions into the
//! [`contexts::NetworkContext`] and the [`contexts::GrabbableState`], and reactive systems turn
//! those into components on the `hecs` world.
//!
//! # Getting started
//! Build a [`Session`] for each peer with a [`SessionBuilder`], wire [`Session::drain_outgoing`]
//! and [`Session::receive`] up to whatever transport you like, and call [`Session::tick`] once per
//! frame.

pub use glam;
pub use hecs;
pub use rapier3d;

pub use hotham_error::HothamError;
pub use session::{Session, SessionBuilder};

/// Actions, and the envelopes they travel in
pub mod action;
/// Components are data that are used to update the simulation and interact with the external world
pub mod components;
pub mod config;
/// Contexts are wrappers around session-wide state that the systems interact with
pub mod contexts;
mod hotham_error;
pub mod identity;
pub mod reactive;
mod session;
/// Systems are functions called each tick to update the simulation
pub mod systems;
/// Kitchen sink utility functions
pub mod util;

/// Hotham result type
pub type HothamResult<T> = std::result::Result<T, HothamError>;

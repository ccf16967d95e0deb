//! Devcontainer plumbing: descriptor synthesis, credential isolation, and
//! container engine calls.
//!
//! The descriptor module owns the on-disk `.devcontainer/` layout, isolate
//! refreshes the per-workspace credential and editor caches the descriptor
//! mounts, and runtime drives the `devcontainer` CLI and the container
//! engine underneath it.

pub mod descriptor;
pub mod error;
pub mod isolate;
pub mod runtime;

pub use descriptor::{CopySpec, MountSpec};
pub use error::{DevcontainerError, DevcontainerResult};
pub use runtime::{ContainerInfo, Runtime};

pub mod authority;
pub mod grab_input;
pub mod grabbable_reactor;
pub mod grabbing;
pub mod physics;
pub mod spawning;

pub use authority::{authority_system, AuthorityReactor, GrantReactor};
pub use grab_input::grab_input_system;
pub use grabbable_reactor::{grabbable_reactor_system, GrabbableReactor};
pub use grabbing::{drop, grab, grabbing_system};
pub use physics::physics_system;
pub use spawning::{destroy_object, spawn_avatar, spawn_object, spawning_receptor};

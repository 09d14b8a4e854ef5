pub mod action_bus;
pub mod entity_registry;
pub mod grabbable_state;
pub mod input_context;
pub mod network_context;
pub mod physics_context;

pub use action_bus::ActionBus;
pub use entity_registry::EntityRegistry;
pub use grabbable_state::{GrabbableState, GrabbableStateEntry};
pub use input_context::{InputContext, InputSample};
pub use network_context::{AuthorityState, EntityNetworkState, NetworkContext};
pub use physics_context::PhysicsContext;

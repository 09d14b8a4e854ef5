/// Marks the root entity of a user's avatar. Avatars are spawned with a [`super::Grabber`] and two
/// [`super::Hand`] children, see [`crate::systems::spawning::spawn_avatar`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Avatar;

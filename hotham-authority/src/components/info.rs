/// Component that adds some information about the entity
/// Useful for debugging - added by default when an object is spawned over the network
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct Info {
    /// A helpful name
    pub name: String,
}

impl Info {
    /// Shortcut to create a named `Info`
    pub fn new(name: impl Into<String>) -> Self {
        Info { name: name.into() }
    }
}

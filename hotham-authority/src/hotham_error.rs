use thiserror::Error;

use crate::components::EntityUuid;

#[derive(Error, Debug)]
pub enum HothamError {
    #[error("The configuration could not be parsed")]
    InvalidConfig(#[from] serde_json::Error),
    #[error("The entity does not exist")]
    NoSuchEntity(#[from] hecs::NoSuchEntity),
    #[error("The UUID {0} is already registered to another entity")]
    DuplicateUuid(EntityUuid),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

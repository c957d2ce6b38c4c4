use super::event::InteractionEvent;
use super::model::InteractionMode;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("invalid interaction transition: from {from:?} using event {event:?}")]
    InvalidTransition {
        from: InteractionMode,
        event: InteractionEvent,
    },
    #[error("image has not been laid out yet")]
    NotLaidOut,
}

pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{StateError, StateResult};
pub use event::{InteractionEvent, InteractionKind, ModeTransition, PointerEvent};
pub use machine::CropStateMachine;
pub use model::{InteractionMode, PointerCapture, MIN_CROP_SIZE};

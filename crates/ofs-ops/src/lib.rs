//! Scripting-mode insertion strategies and time-grid overlays: the
//! layer that decides *where in time and at what position* a new action
//! lands when the user triggers an insert.

pub mod mode;
pub mod overlay;

pub use mode::{
    apply_insert, AlternatingState, DynamicInjectionParams, InsertContext, RecordingState,
    RecordingSubMode, ScriptingMode, ScriptingStrategy,
};
pub use overlay::{FrameGrid, OverlayGrid, TempoGrid, TEMPO_MULTIPLES};

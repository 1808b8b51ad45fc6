//! CardStudio Core Library
//!
//! Headless direct-manipulation editor for card-news decks: selection,
//! move/resize/rotate drag sessions, debounced undo/redo and slide
//! reordering over a zoomable editable surface.

pub mod blocks;
pub mod clock;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod input;
pub mod layout;
mod markup;
pub mod selection;
pub mod surface;
pub mod transform;
pub mod viewport;

pub use blocks::{NudgeDirection, StructuralBlock};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EditorConfig;
pub use editor::Editor;
pub use error::{EditorError, EditorResult};
pub use history::History;
pub use input::{Key, KeyEvent, KeyOutcome, KeyTarget, Modifiers, PointerEvent};
pub use layout::{Layout, MeasuredLayout, SlideLayout};
pub use selection::{EditMode, Highlight, PointerTarget, SelectionState};
pub use surface::{Element, NodeId, NodeTransform, Surface};
pub use transform::{Compass, DragSession, HandleKind};
pub use viewport::Viewport;

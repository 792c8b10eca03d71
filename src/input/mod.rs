// Purpose: turn user gestures into voice operations
// Owns the keymap, the control form and the visual key state

pub mod error;
pub mod keymap;
pub mod router;
pub mod surface;

pub use error::ValidationError;
pub use keymap::{midi_note_to_freq, note_name, KeyBinding, Keymap};
pub use router::{InputEvent, InputRouter};
pub use surface::{ControlEvent, ControlSurface, Field, SweepRequest};

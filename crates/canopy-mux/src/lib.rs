//! Host terminal integration: tmux session control and list pickers.

pub mod error;
pub mod picker;
pub mod tmux;

pub use error::{MuxError, MuxResult};
pub use picker::{default_picker, FzfPicker, GumPicker, NumberedPicker, Picker};
pub use tmux::in_tmux;

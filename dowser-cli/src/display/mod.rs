mod progress;
mod spinner;

pub use progress::{clear_check_progress_bar, set_check_progress_bar, ProgressWriterFactory};
pub use spinner::Spinner;

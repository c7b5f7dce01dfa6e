//! The editing session behind the quill page: the active document, its live
//! preview, sample selection and the theme setting.

pub mod samples;
pub mod session;

pub use crate::samples::{BLANK_SAMPLE_CONTENT, builtin_samples};
pub use crate::session::{
    DARK_THEME, EditorSession, LIGHT_THEME, SELECTED_SAMPLE_KEY, THEME_KEY,
};

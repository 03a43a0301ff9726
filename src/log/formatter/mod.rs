mod core;
mod json_formatter;
mod text_formatter;

pub use core::{create_formatter, LogFormatter};
pub use json_formatter::JsonFormatter;
pub use text_formatter::TextFormatter;

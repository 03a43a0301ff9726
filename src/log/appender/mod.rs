mod console_appender;
mod file_appender;
mod trait_;

pub use console_appender::{ConsoleAppender, Target};
pub use file_appender::FileAppender;
pub use trait_::{create_appender, LogAppender};

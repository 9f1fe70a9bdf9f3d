//! Built-in tools

pub mod clipboard;
pub mod current_time;
pub mod echo;
pub mod file_write;
pub mod open_url;

pub use clipboard::ClipboardTool;
pub use current_time::CurrentTimeTool;
pub use echo::EchoTool;
pub use file_write::FileWriteTool;
pub use open_url::OpenUrlTool;

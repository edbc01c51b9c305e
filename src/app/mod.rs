pub mod error;
pub mod render;
pub mod shell;
pub mod start;

pub use start::handle_start;

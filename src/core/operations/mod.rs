mod start;

pub use start::{Collaborators, start};

pub mod document;
pub mod revision;
pub mod system;

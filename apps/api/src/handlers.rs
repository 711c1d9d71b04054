//! HTTP handlers.

pub mod bulk;
pub mod directory;
pub mod grants;
pub mod health;

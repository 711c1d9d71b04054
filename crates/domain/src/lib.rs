//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod catalog;
mod grant;
mod user;

pub use catalog::{AccessTier, Instance, InstanceId, System, SystemId, TierId};
pub use grant::{AccessGrant, GrantId, GrantKey, GrantStatus};
pub use user::{EmailAddress, User, UserId};

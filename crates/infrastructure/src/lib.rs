//! Storage adapters for the access-tracking application ports.

#![forbid(unsafe_code)]

mod in_memory_directory_repository;
mod in_memory_grant_repository;
mod postgres_directory_repository;
mod postgres_grant_repository;

pub use in_memory_directory_repository::InMemoryDirectoryRepository;
pub use in_memory_grant_repository::InMemoryGrantRepository;
pub use postgres_directory_repository::PostgresDirectoryRepository;
pub use postgres_grant_repository::PostgresGrantRepository;

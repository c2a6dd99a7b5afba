//! Database access and the entities served by the record service.

pub mod errors;
pub mod db;
pub mod schema;
pub mod author;
pub mod book;
pub mod person;

#[cfg(test)]
mod tests;

//! Generic record service on top of sea-orm entities.
//! - Translates the caller filter dialect into sea-orm conditions.
//! - Decides between plain, count-only and paginated finds.
//! - Opens a fresh repository session for every operation.

pub mod config;
pub mod errors;
pub mod events;
pub mod merge;
pub mod pagination;
pub mod params;
pub mod populate;
pub mod query;
pub mod record_service;
pub mod result;
pub mod session;
#[cfg(test)]
pub mod test_support;
#[cfg(test)]
mod tests;

pub use config::{Method, Multi, ServiceConfig};
pub use errors::{ServiceError, ServiceResult};
pub use params::{Id, Params};
pub use record_service::RecordService;
pub use result::{FindResult, OneOrMany, Paginated};
pub use session::{Repository, SessionProvider};

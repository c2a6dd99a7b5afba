/// Book service behaviour: create/get round trips, find and pagination
pub mod book_tests;



/// Events, multi policy and relation population
pub mod hooks_tests;


use anyhow::Result;
use models::{book, person};
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::params::Id;
use crate::record_service::RecordService;
use crate::test_support::service;

pub(crate) async fn book_service(config: ServiceConfig) -> Result<RecordService<book::Entity>> {
    service::<book::Entity>(config.id_field("uuid")).await
}

pub(crate) async fn people() -> Result<RecordService<person::Entity>> {
    service::<person::Entity>(ServiceConfig::new("person")).await
}

/// Identity of a returned record.
pub(crate) fn id_of(record: &Value, field: &str) -> Id {
    Id::try_from(&record[field]).expect("record carries its identity")
}

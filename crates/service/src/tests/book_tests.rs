use anyhow::Result;
use serde_json::{json, Value};

use super::{book_service, id_of};
use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::pagination::Paginate;
use crate::params::Params;
use crate::query::StorageOptions;
use crate::result::FindResult;

async fn create_one(svc: &crate::RecordService<models::book::Entity>, data: Value) -> Result<Value> {
    Ok(svc.create(data, None).await?.one().expect("single record"))
}

fn uuids(records: &[Value]) -> Vec<String> {
    records.iter().map(|r| r["uuid"].as_str().unwrap_or_default().to_string()).collect()
}

#[tokio::test]
async fn creates_a_book_with_generated_identity() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    assert_eq!(svc.id_field(), "uuid");
    let book = create_one(&svc, json!({"title": "test"})).await?;
    assert!(book["uuid"].as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()));
    assert_eq!(book["title"], "test");
    assert_eq!(book["popularity"], 0);
    assert_eq!(book["version"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn saved_book_round_trips_through_get() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let book = create_one(&svc, json!({"title": "test"})).await?;
    let saved = svc.get(id_of(&book, "uuid"), None).await?;
    assert_eq!(saved, book);
    Ok(())
}

#[tokio::test]
async fn create_preserves_cardinality() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let created = svc.create(json!([{"title": "a"}, {"title": "b"}, {"title": "c"}]), None).await?;
    let many = created.many().expect("array in, array out");
    assert_eq!(many.len(), 3);
    let mut ids = uuids(&many);
    ids.dedup();
    assert_eq!(ids.len(), 3);

    let empty = svc.create(json!([]), None).await?;
    assert_eq!(empty.into_vec().len(), 0);
    Ok(())
}

#[tokio::test]
async fn create_rejects_bad_payloads_before_writing() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    for bad in [json!({"nope": 1}), json!({"title": null}), json!("just a string"), json!([{"title": "ok"}, 3])] {
        let err = svc.create(bad.clone(), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidData(_)), "{bad} -> {err:?}");
    }
    assert!(svc.find(None).await?.data().is_empty());
    Ok(())
}

#[tokio::test]
async fn find_without_params_returns_everything() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book").paginate(Some(1), Some(1))).await?;
    let a = create_one(&svc, json!({"title": "test"})).await?;
    let b = create_one(&svc, json!({"title": "another"})).await?;
    let found = svc.find(None).await?;
    let FindResult::All(mut all) = found else { panic!("expected a plain list") };
    assert_eq!(all.len(), 2);
    let mut expected = vec![a, b];
    all.sort_by_key(|r| r["uuid"].to_string());
    expected.sort_by_key(|r| r["uuid"].to_string());
    assert_eq!(all, expected);
    Ok(())
}

#[tokio::test]
async fn finds_by_query() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let a = create_one(&svc, json!({"title": "test"})).await?;
    create_one(&svc, json!({"title": "another"})).await?;
    let found = svc.find(Some(&Params::query(json!({"title": "test"}))?)).await?;
    assert_eq!(found.into_data(), vec![a]);
    Ok(())
}

#[tokio::test]
async fn honors_sort_and_caller_options() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let test = create_one(&svc, json!({"title": "test"})).await?;
    let another = create_one(&svc, json!({"title": "another"})).await?;

    let sorted = svc.find(Some(&Params::query(json!({"$sort": {"title": 1}}))?)).await?;
    assert_eq!(sorted.into_data(), vec![another.clone(), test.clone()]);

    let opts: StorageOptions = serde_json::from_value(json!({"orderBy": {"title": "ASC"}}))?;
    let sorted = svc.find(Some(&Params::default().with_options(opts))).await?;
    assert_eq!(sorted.into_data(), vec![another.clone(), test.clone()]);

    // caller options win over the translated $sort
    let opts: StorageOptions = serde_json::from_value(json!({"orderBy": {"title": "DESC"}}))?;
    let params = Params::query(json!({"$sort": {"title": 1}}))?.with_options(opts);
    assert_eq!(svc.find(Some(&params)).await?.into_data(), vec![test, another]);
    Ok(())
}

#[tokio::test]
async fn limit_returns_a_page_when_pagination_is_enabled() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    for _ in 0..3 {
        create_one(&svc, json!({"title": "test"})).await?;
    }
    let params = Params::query(json!({"title": "test", "$limit": 2}))?.with_paginate(Paginate::Toggle(true));
    let page = svc.find(Some(&params)).await?;
    let page = page.page().expect("paginated envelope");
    assert_eq!((page.total, page.limit, page.skip, page.data.len()), (3, 2, 0, 2));

    // without pagination the same call yields a plain, limited list
    let params = Params::query(json!({"title": "test", "$limit": 2}))?;
    match svc.find(Some(&params)).await? {
        FindResult::All(rows) => assert_eq!(rows.len(), 2),
        other => panic!("expected plain list, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn skip_offsets_in_stable_order() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book").paginate(Some(10), None)).await?;
    let created = svc.create(json!([{"title": "test"}, {"title": "test"}, {"title": "test"}]), None).await?.into_vec();
    let mut ordered = uuids(&created);
    ordered.sort();

    let page = svc.find(Some(&Params::query(json!({"title": "test", "$limit": 2, "$skip": 1}))?)).await?;
    let page = page.page().expect("paginated envelope");
    assert_eq!((page.total, page.limit, page.skip), (3, 2, 1));
    assert_eq!(uuids(&page.data), ordered[1..].to_vec());
    Ok(())
}

#[tokio::test]
async fn default_limit_applies_without_caller_limit() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book").paginate(Some(1), None)).await?;
    svc.create(json!([{"title": "test"}, {"title": "test"}, {"title": "test"}]), None).await?;
    let page = svc.find(Some(&Params::query(json!({"title": "test"}))?)).await?;
    let page = page.page().expect("paginated envelope");
    assert_eq!((page.total, page.limit, page.skip, page.data.len()), (3, 1, 0, 1));
    Ok(())
}

#[tokio::test]
async fn max_caps_every_limit() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book").paginate(Some(1), Some(2))).await?;
    svc.create(json!([{"title": "test"}, {"title": "test"}, {"title": "test"}]), None).await?;

    let with_limit = svc.find(Some(&Params::query(json!({"title": "test", "$limit": 5}))?)).await?;
    let page = with_limit.page().expect("paginated envelope");
    assert_eq!((page.total, page.limit, page.data.len()), (3, 2, 2));

    // max applies on its own when the caller gives no limit
    let without = svc.find(Some(&Params::query(json!({"title": "test"}))?)).await?;
    let page = without.page().expect("paginated envelope");
    assert_eq!((page.total, page.limit, page.data.len()), (3, 2, 2));
    Ok(())
}

#[tokio::test]
async fn limit_zero_only_counts() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    svc.create(json!([{"title": "test"}, {"title": "test"}, {"title": "other"}]), None).await?;
    for skip in [0, 5] {
        let res = svc.find(Some(&Params::query(json!({"title": "test", "$limit": 0, "$skip": skip}))?)).await?;
        let page = res.page().expect("count-only envelope");
        assert_eq!((page.total, page.limit, page.skip), (2, 0, skip));
        assert!(page.data.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn paginated_without_limit_reports_total() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    svc.create(json!([{"title": "a"}, {"title": "b"}]), None).await?;
    let res = svc.find(Some(&Params::default().with_paginate(Paginate::Toggle(true)))).await?;
    let page = res.page().expect("paginated envelope");
    assert_eq!((page.total, page.limit, page.data.len()), (2, 2, 2));
    Ok(())
}

#[tokio::test]
async fn paginate_false_returns_plain_list_capped_by_max() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book").paginate(Some(1), Some(2))).await?;
    svc.create(json!([{"title": "test"}, {"title": "test"}, {"title": "test"}]), None).await?;
    let params = Params::query(json!({"title": "test"}))?.with_paginate(Paginate::Toggle(false));
    match svc.find(Some(&params)).await? {
        FindResult::All(rows) => assert_eq!(rows.len(), 2),
        other => panic!("expected plain list, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn get_reports_missing_and_malformed_ids_as_not_found() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let err = svc.get(uuid::Uuid::new_v4(), None).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "not found: book not found");
    assert!(svc.get("not-a-uuid", None).await.unwrap_err().is_not_found());
    assert!(svc.get(42, None).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn get_combines_id_with_query() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let book = create_one(&svc, json!({"title": "test"})).await?;
    let id = id_of(&book, "uuid");
    assert_eq!(svc.get(id.clone(), Some(&Params::query(json!({"title": "test"}))?)).await?, book);
    let err = svc.get(id.clone(), Some(&Params::query(json!({"title": "other"}))?)).await.unwrap_err();
    assert!(err.is_not_found());
    // a malformed query is a caller error, not a missing record
    let err = svc.get(id, Some(&Params::query(json!({"title": {"$bogus": 1}}))?)).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidQuery(_)));
    Ok(())
}

#[tokio::test]
async fn unknown_id_field_fails_construction() -> Result<()> {
    let provider = crate::test_support::memory_provider().await?;
    let res = crate::RecordService::<models::book::Entity>::new(provider, ServiceConfig::new("book").id_field("isbn"));
    assert!(matches!(res, Err(ServiceError::Config(_))));
    Ok(())
}

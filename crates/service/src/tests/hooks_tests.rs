use anyhow::Result;
use serde_json::{json, Value};

use super::{book_service, id_of};
use crate::config::{Method, Multi, ServiceConfig};
use crate::errors::ServiceError;
use crate::params::Params;
use crate::populate::Related;
use crate::test_support::memory_provider;
use crate::RecordService;
use models::{author, book};

#[tokio::test]
async fn mutations_broadcast_events() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let mut rx = svc.subscribe();

    let created = svc.create(json!({"title": "a"}), None).await?.one().expect("one");
    let id = id_of(&created, "uuid");
    svc.update(id.clone(), json!({"title": "b"}), None).await?;
    svc.patch(Some(id.clone()), json!({"title": "c"}), None).await?;
    svc.remove(Some(id), None).await?;

    let mut seen = Vec::new();
    for _ in 0..4 {
        let ev = rx.recv().await?;
        assert_eq!(ev.service, "book");
        seen.push((ev.event, ev.data["title"].clone()));
    }
    assert_eq!(seen, vec![
        ("created".to_string(), json!("a")),
        ("updated".to_string(), json!("b")),
        ("patched".to_string(), json!("c")),
        ("removed".to_string(), json!("c")),
    ]);
    Ok(())
}

#[tokio::test]
async fn failed_mutations_stay_silent() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book")).await?;
    let mut rx = svc.subscribe();
    assert!(svc.patch(Some(uuid::Uuid::new_v4().into()), json!({"title": "x"}), None).await.is_err());
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn custom_events_are_configured() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book").events(["testing"])).await?;
    let mut rx = svc.subscribe();
    svc.emit("testing", json!({"hello": "world"}))?;
    let ev = rx.recv().await?;
    assert_eq!((ev.event.as_str(), ev.data), ("testing", json!({"hello": "world"})));
    assert!(svc.emit("unknown", Value::Null).is_err());
    Ok(())
}

#[tokio::test]
async fn multi_policy_guards_batch_calls() -> Result<()> {
    let svc = book_service(ServiceConfig::new("book").multi(Multi::Disabled)).await?;
    let err = svc.create(json!([{"title": "a"}]), None).await.unwrap_err();
    assert!(matches!(err, ServiceError::MethodNotAllowed(_)));
    assert_eq!(err.code(), 405);

    // single-record calls stay allowed
    let one = svc.create(json!({"title": "a"}), None).await?.one().expect("one");
    let params = Params::query(json!({"title": "a"}))?;
    assert!(matches!(svc.patch(None, json!({"popularity": 2}), Some(&params)).await, Err(ServiceError::MethodNotAllowed(_))));
    assert!(matches!(svc.remove(None, Some(&params)).await, Err(ServiceError::MethodNotAllowed(_))));
    assert!(svc.remove(Some(id_of(&one, "uuid")), None).await.is_ok());

    let svc = book_service(ServiceConfig::new("book").multi(Multi::Methods(vec![Method::Create]))).await?;
    assert_eq!(svc.create(json!([{"title": "a"}, {"title": "b"}]), None).await?.into_vec().len(), 2);
    assert!(matches!(svc.remove(None, None).await, Err(ServiceError::MethodNotAllowed(_))));
    Ok(())
}

async fn library() -> Result<(RecordService<author::Entity>, RecordService<book::Entity>)> {
    let provider = memory_provider().await?;
    let authors = RecordService::<author::Entity>::new(
        provider.clone(),
        ServiceConfig::new("author").relation("books", Related::<book::Entity>::has_many("id", book::Column::AuthorId)),
    )?;
    let books = RecordService::<book::Entity>::new(
        provider,
        ServiceConfig::new("book")
            .id_field("uuid")
            .relation("author", Related::<author::Entity>::belongs_to("author_id", author::Column::Id)),
    )?;
    Ok((authors, books))
}

#[tokio::test]
async fn populate_belongs_to_and_has_many() -> Result<()> {
    let (authors, books) = library().await?;
    let herbert = authors.create(json!({"name": "Herbert"}), None).await?.one().expect("one");
    let lonely = authors.create(json!({"name": "Lonely"}), None).await?.one().expect("one");
    books
        .create(
            json!([
                {"title": "Dune", "author_id": herbert["id"]},
                {"title": "Messiah", "author_id": herbert["id"]},
                {"title": "Anonymous"}
            ]),
            None,
        )
        .await?;

    let params = Params::query(json!({"$sort": {"title": 1}}))?.with_populate(["author"]);
    let found = books.find(Some(&params)).await?.into_data();
    assert_eq!(found[0]["title"], "Anonymous");
    assert_eq!(found[0]["author"], Value::Null);
    assert_eq!(found[1]["author"], herbert);
    assert_eq!(found[2]["author"]["name"], "Herbert");

    let with_books = authors.get(id_of(&herbert, "id"), Some(&Params::default().with_populate(["books"]))).await?;
    let titles: Vec<_> = with_books["books"].as_array().map(|b| b.iter().map(|x| x["title"].clone()).collect()).unwrap_or_default();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&json!("Dune")) && titles.contains(&json!("Messiah")));

    let empty = authors.get(id_of(&lonely, "id"), Some(&Params::default().with_populate(["books"]))).await?;
    assert_eq!(empty["books"], json!([]));
    Ok(())
}

#[tokio::test]
async fn populated_keys_survive_select() -> Result<()> {
    let (authors, books) = library().await?;
    let herbert = authors.create(json!({"name": "Herbert"}), None).await?.one().expect("one");
    let dune = books.create(json!({"title": "Dune", "author_id": herbert["id"]}), None).await?.one().expect("one");

    let params = Params::query(json!({"$select": ["title"]}))?.with_populate(["author"]);
    let got = books.get(id_of(&dune, "uuid"), Some(&params)).await?;
    assert_eq!(got, json!({"uuid": dune["uuid"], "title": "Dune", "author": herbert}));
    Ok(())
}

#[tokio::test]
async fn unknown_relation_is_invalid_query() -> Result<()> {
    let (_, books) = library().await?;
    let err = books.find(Some(&Params::default().with_populate(["publisher"]))).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidQuery(_)));
    Ok(())
}

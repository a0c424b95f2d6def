//! End-to-end scenarios over an in-memory table.
//!
//! These mirror how a host uses the engine: point CRUD through a [`Table`],
//! listings and pages, and repeated version pulls feeding the returned
//! watermark back in as the next cursor.

mod common;

use common::{context, MemoryDb};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tidemark_engine::{CounterCache, EntityDef, ListOptions, MemoryCounter, Table};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Info {
    #[serde(default)]
    id: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct Info2 {
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    deleted: bool,
}

fn info(name: &str) -> Info {
    Info {
        id: String::new(),
        name: name.into(),
    }
}

fn info2(kind: &str, name: &str) -> Info2 {
    Info2 {
        kind: kind.into(),
        name: name.into(),
        ..Default::default()
    }
}

fn setup(def: EntityDef) -> (Arc<MemoryDb>, Arc<MemoryCounter>, Table) {
    let db = Arc::new(MemoryDb::new());
    let cache = Arc::new(MemoryCounter::new());
    let table = context(&db, &cache).table(&Arc::new(def));
    (db, cache, table)
}

fn named(name: &str) -> ListOptions {
    ListOptions::new().filter("`name`=?", vec![json!(name)])
}

fn type_a() -> ListOptions {
    ListOptions::new().filter("`type`='A'", vec![])
}

#[tokio::test]
async fn crud_without_versioning() {
    let (_, _, d1) = setup(EntityDef::new("d1", "id,name"));

    let id = d1.insert(&info("AAA")).await.unwrap();
    assert!(!id.is_empty());

    let got: Info = d1.get(&id).await.unwrap().unwrap();
    assert_eq!(got.name, "AAA");

    let id2 = d1.insert(&info("BBB")).await.unwrap();
    let mut second: Info = d1.get(&id2).await.unwrap().unwrap();
    assert_eq!(second.name, "BBB");

    let only_aaa: Vec<Info> = d1.list(named("AAA")).query_all().await.unwrap();
    assert_eq!(only_aaa.len(), 1);
    assert_eq!(only_aaa[0].id, id);

    second.name = "AAA".into();
    d1.update(&second).await.unwrap();

    let both: Vec<Info> = d1.list(named("AAA")).query_all().await.unwrap();
    assert_eq!(both.len(), 2);
    assert!(both.iter().any(|i| i.id == id));
    assert!(both.iter().any(|i| i.id == id2));

    d1.delete(&id).await.unwrap();

    let after_delete: Vec<Info> = d1.list(named("AAA")).query_all().await.unwrap();
    assert_eq!(after_delete.len(), 1);
    assert_eq!(after_delete[0].id, id2);

    let gone: Option<Info> = d1.get(&id).await.unwrap();
    assert_eq!(gone, None);
}

#[tokio::test]
async fn insert_then_get_round_trips() {
    let (_, _, d2) = setup(EntityDef::with_version("d2", "id,type,name,deleted"));

    let record = info2("A", "日本語 🎉");
    let id = d2.insert(&record).await.unwrap();

    let got: Info2 = d2.get(&id).await.unwrap().unwrap();
    assert_eq!(got.id, id);
    assert_eq!(got.kind, record.kind);
    assert_eq!(got.name, record.name);
    assert!(!got.deleted);
}

#[tokio::test]
async fn incremental_sync_cycle() {
    let (_, cache, d2) = setup(EntityDef::with_version("d2", "id,name"));

    d2.insert(&info2("A", "1")).await.unwrap();
    d2.insert(&info2("B", "2")).await.unwrap();
    d2.insert(&info2("A", "11")).await.unwrap();
    let deleted_id = d2.insert(&info2("A", "111")).await.unwrap();
    assert_eq!(cache.get("_DATA_VERSION_d2").await.unwrap(), Some(4));

    let mut list: Vec<Info2> = Vec::new();
    let version = d2.list(type_a()).query_by_version(&mut list, 0, 0).await;
    assert_eq!(version, 4);
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|i| !i.deleted));

    // A delete is a change like any other and carries its tombstone.
    d2.delete(&deleted_id).await.unwrap();
    let mut list: Vec<Info2> = Vec::new();
    let version = d2.list(type_a()).query_by_version(&mut list, version, 0).await;
    assert_eq!(version, 5);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, deleted_id);
    assert!(list[0].deleted);

    d2.insert(&info2("A", "1111")).await.unwrap();
    d2.insert(&info2("B", "11111")).await.unwrap();
    let mut list: Vec<Info2> = Vec::new();
    let version = d2.list(type_a()).query_by_version(&mut list, version, 0).await;
    assert_eq!(version, 7);
    assert_eq!(list.len(), 1);

    let mut by_id: HashMap<String, Info2> = HashMap::new();
    let full = d2.list(type_a()).query_by_version(&mut by_id, 0, 0).await;
    assert_eq!(full, 7);
    assert_eq!(by_id.len(), 4);
    assert!(by_id[&deleted_id].deleted);
}

#[tokio::test]
async fn repeated_pull_without_writes_is_stable() {
    let (_, _, d2) = setup(EntityDef::with_version("d2", "id,name"));
    for name in ["a", "b", "c"] {
        d2.insert(&info2("A", name)).await.unwrap();
    }

    let list = d2.list(type_a());
    let mut first: Vec<Info2> = Vec::new();
    let mut second: Vec<Info2> = Vec::new();
    let w1 = list.query_by_version(&mut first, 1, 0).await;
    let w2 = list.query_by_version(&mut second, 1, 0).await;

    assert_eq!(w1, 3);
    assert_eq!(w1, w2);
    assert_eq!(first, second);

    let mut nothing: Vec<Info2> = Vec::new();
    assert_eq!(list.query_by_version(&mut nothing, w1, 0).await, w1);
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn soft_deleted_rows_hidden_from_reads_but_not_pulls() {
    let (_, _, d2) = setup(EntityDef::with_version("d2", "id,name"));
    let keep = d2.insert(&info2("A", "keep")).await.unwrap();
    let drop = d2.insert(&info2("A", "drop")).await.unwrap();
    d2.delete(&drop).await.unwrap();

    let list = d2.list(ListOptions::new());
    assert_eq!(list.count().await.unwrap(), 1);

    let all: Vec<Info2> = list.query_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, keep);

    let page: Vec<Info2> = list.query_by_page(0, 10).await.unwrap();
    assert_eq!(page.len(), 1);

    let mut pulled: HashMap<String, Info2> = HashMap::new();
    assert_eq!(list.query_by_version(&mut pulled, 0, 0).await, 3);
    assert_eq!(pulled.len(), 2);
    assert!(pulled[&drop].deleted);
    assert!(!pulled[&keep].deleted);
}

#[tokio::test]
async fn cold_cache_recovers_watermark_from_table() {
    let (db, cache, d2) = setup(EntityDef::with_version("d2", "id,name"));
    for name in ["a", "b", "c"] {
        d2.insert(&info2("A", name)).await.unwrap();
    }

    cache.evict("_DATA_VERSION_d2");

    // Reads fall back to the stored maximum without reseeding.
    let mut out: Vec<Info2> = Vec::new();
    assert_eq!(d2.list(ListOptions::new()).query_by_version(&mut out, 0, 0).await, 3);
    assert_eq!(cache.get("_DATA_VERSION_d2").await.unwrap(), None);

    // The next write reseeds and continues after the stored maximum.
    d2.insert(&info2("A", "d")).await.unwrap();
    assert_eq!(cache.get("_DATA_VERSION_d2").await.unwrap(), Some(4));

    let versions: Vec<u64> = db
        .rows("d2")
        .iter()
        .filter_map(|row| row.get("version").and_then(|v| v.as_u64()))
        .collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn pagination_follows_order() {
    let (_, _, d1) = setup(EntityDef::new("d1", "id,name"));
    for name in ["5", "3", "9", "1", "7", "2", "8", "4", "6"] {
        d1.insert(&info(name)).await.unwrap();
    }

    let list = d1.list(ListOptions::new().order_by("`name`"));
    assert_eq!(list.count().await.unwrap(), 9);

    let all: Vec<Info> = list.query_all().await.unwrap();
    assert_eq!(all.len(), 9);

    let first: Vec<Info> = list.query_by_page(0, 3).await.unwrap();
    let names: Vec<&str> = first.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["1", "2", "3"]);

    let second: Vec<Info> = list.query_by_page(3, 3).await.unwrap();
    let names: Vec<&str> = second.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["4", "5", "6"]);
}

#[tokio::test]
async fn update_by_stamps_every_match() {
    let (db, _, d2) = setup(EntityDef::with_version("d2", "id,name"));
    d2.insert(&info2("A", "x")).await.unwrap();
    d2.insert(&info2("B", "y")).await.unwrap();

    let patch = json!({"name": "renamed"});
    d2.update_by(patch.as_object().unwrap(), "`type`=?", vec![json!("A")])
        .await
        .unwrap();

    let rows = db.rows("d2");
    let renamed: Vec<_> = rows.iter().filter(|r| r["name"] == json!("renamed")).collect();
    assert_eq!(renamed.len(), 1);
    assert_eq!(renamed[0]["version"], json!(3));
    assert_eq!(renamed[0]["type"], json!("A"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_get_distinct_consecutive_versions() {
    let (db, cache, d2) = setup(EntityDef::with_version("d2", "id,name"));
    d2.insert(&info2("A", "seed")).await.unwrap();
    let before = cache.get("_DATA_VERSION_d2").await.unwrap().unwrap();

    let mut handles = Vec::new();
    for i in 0..32 {
        let d2 = d2.clone();
        handles.push(tokio::spawn(async move {
            d2.insert(&info2("A", &i.to_string())).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut versions: Vec<u64> = db
        .rows("d2")
        .iter()
        .filter_map(|row| row.get("version").and_then(|v| v.as_u64()))
        .filter(|v| *v > before)
        .collect();
    versions.sort_unstable();
    assert_eq!(versions, ((before + 1)..=(before + 32)).collect::<Vec<_>>());
}

//! Integration tests for live collections and their mutators.
//!
//! The in-memory realtime store delivers snapshots synchronously, but the
//! assertions wait on the collection's watch channel so they hold for any
//! backend that delivers asynchronously.

use std::sync::Arc;
use std::time::Duration;

use backoffice_core::memory::MemoryRealtimeStore;
use backoffice_core::model::{BUILTIN_NEWSLETTERS, NO_DEPARTMENT};
use backoffice_core::{
    CollectionView, EmployeeDraft, Employees, Entity, Error, IssueDraft, LiveCollection, News,
    NewsDraft, NewsItem, NewsletterDraft, NewsletterEdit, NewsletterIssue, Newsletters, RealtimeStore,
};
use serde_json::json;
use tokio::sync::watch;

async fn settle<T: Clone>(
    rx: &mut watch::Receiver<CollectionView<T>>,
    ready: impl FnMut(&CollectionView<T>) -> bool,
) -> CollectionView<T> {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(ready))
        .await
        .expect("collection did not settle in time")
        .expect("collection dropped")
        .clone()
}

#[tokio::test]
async fn created_employee_appears_and_delete_removes_it() {
    let store = MemoryRealtimeStore::new();
    let employees = Employees::open(Arc::new(store.clone())).await;
    let mut rx = employees.collection().watch();

    let view = settle(&mut rx, |v| !v.loading).await;
    assert!(view.items.is_empty());
    assert_eq!(view.error, None);

    let draft = EmployeeDraft::new("Maria Santos", "2024", "2024-07-01");
    let id = employees.create(&draft).await.unwrap();
    assert!(!id.is_empty());

    let view = settle(&mut rx, |v| v.items.len() == 1).await;
    let maria = &view.items[0];
    assert_eq!(maria.id, id);
    assert_eq!(maria.name, "Maria Santos");
    assert_eq!(maria.start_year, "2024");
    assert_eq!(maria.start_date, "2024-07-01");
    assert_eq!(maria.end_date, None);
    assert_eq!(maria.department_or_default(), NO_DEPARTMENT);
    assert!(maria.created_at.is_some());
    assert_eq!(maria.created_at, maria.updated_at);

    employees.delete(&id).await.unwrap();
    let view = settle(&mut rx, |v| v.items.is_empty()).await;
    assert!(view.items.is_empty());
    assert_eq!(store.value(&format!("employees/{id}")), None);
}

#[tokio::test]
async fn update_overwrites_every_field() {
    let store = MemoryRealtimeStore::new();
    let employees = Employees::open(Arc::new(store.clone())).await;
    let mut rx = employees.collection().watch();

    let draft = EmployeeDraft::new("Maria Santos", "2024", "2024-07-01")
        .with_end_date("2025-01-31")
        .with_department("Comunicação");
    let id = employees.create(&draft).await.unwrap();
    settle(&mut rx, |v| v.items.len() == 1).await;

    employees
        .update(&id, &EmployeeDraft::new("Maria S.", "2023", "2023-09-01"))
        .await
        .unwrap();
    let restored = EmployeeDraft::new("Maria Santos", "2024", "2024-07-01").with_department("Rede");
    employees.update(&id, &restored).await.unwrap();

    let view = settle(&mut rx, |v| {
        v.items
            .first()
            .is_some_and(|e| e.department.as_deref() == Some("Rede"))
    })
    .await;
    let maria = &view.items[0];
    assert_eq!(maria.name, "Maria Santos");
    assert_eq!(maria.department.as_deref(), Some("Rede"));
    // Cleared by the first update and not restored by the second.
    assert_eq!(maria.end_date, None);
    assert!(maria.updated_at >= maria.created_at);
}

#[tokio::test]
async fn employees_sort_by_name_and_group_by_department() {
    let store = MemoryRealtimeStore::new().with_value(
        "employees",
        json!({
            "a": {"name": "rui Costa", "startYear": 2020, "startDate": "2020-01-06", "department": "Rede"},
            "b": {"name": "Ana Lopes", "startYear": "2022", "startDate": "2022-03-01"},
            "c": {"name": "Maria Santos", "startYear": "2024", "startDate": "2024-07-01", "department": "Rede"}
        }),
    );
    let employees = Employees::open(Arc::new(store)).await;

    let names: Vec<_> = employees.items().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["Ana Lopes", "Maria Santos", "rui Costa"]);
    assert_eq!(employees.total(), 3);
    assert_eq!(employees.items()[2].start_year, "2020");

    let groups = employees.by_department();
    assert_eq!(groups["Rede"].len(), 2);
    assert_eq!(groups[NO_DEPARTMENT].len(), 1);
}

#[tokio::test]
async fn validation_failures_never_reach_the_store() {
    let store = MemoryRealtimeStore::new();
    let employees = Employees::open(Arc::new(store.clone())).await;
    store.fail_writes_with(Some(Error::Mutation("store must not be called".into())));

    let err = employees
        .create(&EmployeeDraft::new("  ", "2024", "2024-07-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = employees
        .update("", &EmployeeDraft::new("Maria Santos", "2024", "2024-07-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let news = News::open(Arc::new(store.clone())).await;
    let err = news.create(&NewsDraft::new("\n")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn backend_write_failure_surfaces_as_mutation_error() {
    let store = MemoryRealtimeStore::new();
    let employees = Employees::open(Arc::new(store.clone())).await;
    store.fail_writes_with(Some(Error::Subscription("offline".into())));

    let err = employees
        .create(&EmployeeDraft::new("Maria Santos", "2024", "2024-07-01"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Mutation(_)));
    assert!(employees.items().is_empty());
}

#[tokio::test]
async fn subscription_error_is_captured_not_raised() {
    let store = MemoryRealtimeStore::new();
    let employees = Employees::open(Arc::new(store.clone())).await;
    let mut rx = employees.collection().watch();

    store.emit_error("employees", Error::Subscription("permission denied".into()));

    let view = settle(&mut rx, |v| v.error.is_some()).await;
    assert!(!view.loading);
    assert!(view.error.unwrap().contains("permission denied"));
}

#[tokio::test]
async fn undecodable_entries_are_skipped_and_reported() {
    let store = MemoryRealtimeStore::new().with_value(
        "news",
        json!({
            "good": {"title": "Abertas as inscrições", "createdAt": "2024-05-01T10:00:00.000Z"},
            "bad": {"title": 42}
        }),
    );
    let news = News::open(Arc::new(store)).await;

    let view = news.collection().view();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, "good");
    assert!(view.error.unwrap().contains("bad"));
}

#[tokio::test]
async fn news_is_listed_newest_first() {
    let store = MemoryRealtimeStore::new().with_value(
        "news",
        json!({
            "old": {"title": "Antiga", "createdAt": "2023-01-01T00:00:00.000Z"},
            "new": {"title": "Recente", "createdAt": "2024-06-01T00:00:00.000Z"},
            "undated": {"title": "Sem data"}
        }),
    );
    let news = News::open(Arc::new(store)).await;

    let ids: Vec<_> = news.items().into_iter().map(|n| n.id).collect();
    assert_eq!(ids, ["new", "old", "undated"]);
}

#[tokio::test]
async fn path_switch_keeps_exactly_one_subscription() {
    let store = MemoryRealtimeStore::new();
    let mut issues: LiveCollection<NewsletterIssue> =
        LiveCollection::open(Arc::new(store.clone()), Some("newsletters/a/issues")).await;
    assert_eq!(store.listener_count("newsletters/a/issues"), 1);

    issues.set_path(Some("newsletters/b/issues")).await;
    assert_eq!(store.listener_count("newsletters/a/issues"), 0);
    assert_eq!(store.listener_count("newsletters/b/issues"), 1);

    // Writes under the old path no longer reach the collection.
    store
        .push("newsletters/a/issues", json!({"title": "A", "publishedAt": "2024-01-01"}))
        .await
        .unwrap();
    assert!(issues.is_empty());

    store
        .push("newsletters/b/issues", json!({"title": "B", "publishedAt": "2024-01-01"}))
        .await
        .unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues.items()[0].title, "B");

    issues.set_path(Some("newsletters/b/issues")).await;
    assert_eq!(store.listener_count("newsletters/b/issues"), 1);

    issues.set_path(None).await;
    assert_eq!(store.listener_count("newsletters/b/issues"), 0);
    assert!(!issues.is_subscribed());
    assert!(issues.is_empty());
    assert!(!issues.is_loading());
}

#[tokio::test]
async fn dropping_a_collection_releases_its_listener() {
    let store = MemoryRealtimeStore::new();
    let news: LiveCollection<NewsItem> =
        LiveCollection::open(Arc::new(store.clone()), Some("news")).await;
    assert_eq!(store.listener_count("news"), 1);

    drop(news);
    assert_eq!(store.listener_count("news"), 0);
}

#[tokio::test]
async fn mutators_on_a_detached_collection_fail() {
    let store = MemoryRealtimeStore::new();
    let issues: LiveCollection<NewsletterIssue> = LiveCollection::detached(Arc::new(store));

    let err = issues.push_entry(json!({"title": "x"})).await.unwrap_err();
    assert!(matches!(err, Error::Mutation(_)));
}

#[tokio::test]
async fn builtin_newsletters_are_always_listed() {
    let store = MemoryRealtimeStore::new();
    let newsletters = Newsletters::open(Arc::new(store.clone())).await;

    let names: Vec<_> = newsletters.items().into_iter().map(|n| n.name).collect();
    for (name, _) in BUILTIN_NEWSLETTERS {
        assert!(names.iter().any(|n| n == name), "missing {name}");
    }

    let id = newsletters
        .create(&NewsletterDraft::new("boletim", "Boletim Interno").with_color(""))
        .await
        .unwrap();
    let boletim = newsletters.get(&id).unwrap();
    assert_eq!(boletim.display_name, "Boletim Interno");
    assert_eq!(boletim.color, "#3F51B5");

    let displays: Vec<_> = newsletters
        .items()
        .into_iter()
        .map(|n| n.display_name)
        .collect();
    assert_eq!(displays, ["Boletim Interno", "Em Rede", "Raiz Digital"]);
}

#[tokio::test]
async fn editing_a_builtin_keeps_ids_unique_and_folder_fixed() {
    let store = MemoryRealtimeStore::new();
    let newsletters = Newsletters::open(Arc::new(store.clone())).await;

    newsletters
        .update("raiz_digital", &NewsletterEdit::new("Raiz").with_color("#00897B"))
        .await
        .unwrap();

    let items = newsletters.items();
    let mut ids: Vec<_> = items.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), items.len());

    let raiz = newsletters.get("raiz_digital").unwrap();
    assert_eq!(raiz.name, "raiz_digital");
    assert_eq!(raiz.display_name, "Raiz");
    assert_eq!(raiz.color, "#00897B");
    assert_eq!(raiz.image_folder(), "newsletters/raiz_digital");
    assert_eq!(store.value("newsletters/raiz_digital/name"), None);

    let err = newsletters
        .update("raiz_digital", &NewsletterEdit::new("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn editing_a_newsletter_never_renames_it() {
    let store = MemoryRealtimeStore::new();
    let newsletters = Newsletters::open(Arc::new(store.clone())).await;
    let id = newsletters
        .create(&NewsletterDraft::new("boletim", "Boletim"))
        .await
        .unwrap();

    newsletters
        .update(&id, &NewsletterEdit::new("Boletim Mensal"))
        .await
        .unwrap();

    let boletim = newsletters.get(&id).unwrap();
    assert_eq!(boletim.name, "boletim");
    assert_eq!(boletim.display_name, "Boletim Mensal");
    assert_eq!(boletim.image_folder(), "newsletters/boletim");
}

#[tokio::test]
async fn issues_are_written_under_their_newsletter() {
    let store = MemoryRealtimeStore::new();
    let newsletters = Newsletters::open(Arc::new(store.clone())).await;

    let first = newsletters
        .add_issue(
            "em_rede",
            &IssueDraft::new("Edição 1", "2024-01-15").with_url("https://example.org/1"),
        )
        .await
        .unwrap();
    let second = newsletters
        .add_issue("em_rede", &IssueDraft::new("Edição 2", "2024-03-01"))
        .await
        .unwrap();

    let em_rede = newsletters.get("em_rede").unwrap();
    let titles: Vec<_> = em_rede.sorted_issues().into_iter().map(|i| i.title).collect();
    assert_eq!(titles, ["Edição 2", "Edição 1"]);
    assert_eq!(em_rede.display_name, "Em Rede");
    assert_eq!(em_rede.issues[&first].id, first);

    newsletters
        .update_issue("em_rede", &second, &IssueDraft::new("Edição 2 (revista)", "2024-03-01"))
        .await
        .unwrap();
    newsletters.delete_issue("em_rede", &first).await.unwrap();

    let em_rede = newsletters.get("em_rede").unwrap();
    assert_eq!(em_rede.issues.len(), 1);
    assert_eq!(em_rede.issues[&second].title, "Edição 2 (revista)");

    let err = newsletters
        .add_issue("em_rede", &IssueDraft::new("", "2024-03-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn deleting_a_newsletter_removes_its_issues() {
    let store = MemoryRealtimeStore::new();
    let newsletters = Newsletters::open(Arc::new(store.clone())).await;
    let id = newsletters
        .create(&NewsletterDraft::new("boletim", "Boletim"))
        .await
        .unwrap();
    newsletters
        .add_issue(&id, &IssueDraft::new("Edição 1", "2024-01-15"))
        .await
        .unwrap();

    newsletters.delete(&id).await.unwrap();

    assert!(newsletters.get(&id).is_none());
    assert_eq!(store.value(&format!("newsletters/{id}")), None);
}

#[test]
fn entity_ids_are_not_serialized() {
    let mut item: NewsItem = serde_json::from_value(json!({"title": "Olá"})).unwrap();
    item.assign_id("k1".into());
    assert_eq!(item.id(), "k1");
    assert!(serde_json::to_value(&item).unwrap().get("id").is_none());
}

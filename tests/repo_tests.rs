use blotter::models::NewPost;
use blotter::repo::{inmem::InMemRepo, sqlite::SqliteRepo, PostRepo, RepoError};

fn new_post(name: &str, title: &str, content: &str) -> NewPost {
    NewPost { name: name.into(), title: title.into(), content: content.into(), image_path: None }
}

/// Fresh SQLite file per test; the tempdir guard must outlive the repo.
async fn sqlite_repo() -> (SqliteRepo, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("blogs.db").display());
    (SqliteRepo::connect(&url).await.unwrap(), dir)
}

async fn insert_then_get_round_trips(r: &dyn PostRepo) {
    let created = r
        .insert(NewPost {
            name: "Ada".into(),
            title: "Engines".into(),
            content: "Notes on the analytical engine".into(),
            image_path: Some("engine.png".into()),
        })
        .await
        .unwrap();
    assert_eq!(created.likes, 0);
    assert!(!created.liked);

    let fetched = r.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.name, "Ada");
    assert_eq!(fetched.image_path.as_deref(), Some("engine.png"));
}

async fn ids_are_unique_and_increasing(r: &dyn PostRepo) {
    let a = r.insert(new_post("", "one", "1")).await.unwrap();
    let b = r.insert(new_post("", "two", "2")).await.unwrap();
    assert!(b.id > a.id);
}

async fn list_sorts_by_title_with_stable_ties(r: &dyn PostRepo) {
    let b1 = r.insert(new_post("", "B", "first b")).await.unwrap();
    let a = r.insert(new_post("", "A", "a")).await.unwrap();
    let b2 = r.insert(new_post("", "B", "second b")).await.unwrap();
    let lower = r.insert(new_post("", "a", "lowercase")).await.unwrap();

    let ids: Vec<_> = r.list_all().await.unwrap().into_iter().map(|p| p.id).collect();
    // byte order: uppercase sorts before lowercase
    assert_eq!(ids, vec![a.id, b1.id, b2.id, lower.id]);
    // same answer twice
    let again: Vec<_> = r.list_all().await.unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, again);
}

async fn search_semantics(r: &dyn PostRepo) {
    let by_name = r.insert(new_post("Grace", "Compilers", "about COBOL")).await.unwrap();
    let by_content = r.insert(new_post("", "Misc", "a note on rust lifetimes")).await.unwrap();
    let _none = r.insert(new_post("Linus", "Kernels", "scheduling")).await.unwrap();

    assert!(r.search("").await.unwrap().is_empty());

    let hits = r.search("Grace").await.unwrap();
    assert_eq!(hits.iter().map(|p| p.id).collect::<Vec<_>>(), vec![by_name.id]);

    let hits = r.search("lifetimes").await.unwrap();
    assert_eq!(hits.iter().map(|p| p.id).collect::<Vec<_>>(), vec![by_content.id]);

    // case-sensitive
    assert!(r.search("cobol").await.unwrap().is_empty());
    assert_eq!(r.search("COBOL").await.unwrap().len(), 1);

    // OR across fields, insertion order
    let hits = r.search("o").await.unwrap();
    assert_eq!(hits.iter().map(|p| p.id).collect::<Vec<_>>(), vec![by_name.id, by_content.id]);

    assert!(r.search("xyz").await.unwrap().is_empty());
}

async fn rejects_empty_title_or_content(r: &dyn PostRepo) {
    let err = r.insert(new_post("x", "", "body")).await.unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    let err = r.insert(new_post("x", "title", "   ")).await.unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(r.list_all().await.unwrap().is_empty());
}

async fn unknown_id_is_not_found(r: &dyn PostRepo) {
    assert!(matches!(r.get_by_id(4242).await.unwrap_err(), RepoError::NotFound));
}

macro_rules! store_tests {
    ($($name:ident),* $(,)?) => {
        mod inmem_store {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() { super::$name(&InMemRepo::new()).await; }
            )*
        }
        mod sqlite_store {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    let (repo, _dir) = sqlite_repo().await;
                    super::$name(&repo).await;
                }
            )*
        }
    };
}

store_tests!(
    insert_then_get_round_trips,
    ids_are_unique_and_increasing,
    list_sorts_by_title_with_stable_ties,
    search_semantics,
    rejects_empty_title_or_content,
    unknown_id_is_not_found,
);

#[tokio::test]
async fn sqlite_data_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("blogs.db").display());
    let id = {
        let repo = SqliteRepo::connect(&url).await.unwrap();
        repo.insert(new_post("", "kept", "on disk")).await.unwrap().id
    };
    let repo = SqliteRepo::connect(&url).await.unwrap();
    assert_eq!(repo.get_by_id(id).await.unwrap().title, "kept");
}

async fn distinct_ids_under_concurrent_inserts<R>(repo: R)
where
    R: PostRepo + Clone + 'static,
{
    let mut handles = Vec::new();
    for i in 0..16 {
        let r = repo.clone();
        handles.push(tokio::spawn(async move {
            r.insert(new_post("", &format!("t{i}"), "c")).await.unwrap().id
        }));
    }
    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(repo.list_all().await.unwrap().len(), 16);
}

#[tokio::test]
async fn concurrent_inserts_get_distinct_ids() {
    distinct_ids_under_concurrent_inserts(InMemRepo::new()).await;
}

#[tokio::test]
async fn concurrent_sqlite_inserts_get_distinct_ids() {
    let (repo, _dir) = sqlite_repo().await;
    distinct_ids_under_concurrent_inserts(repo).await;
}

#[tokio::test]
async fn in_memory_sqlite_url_keeps_schema_and_rows() {
    let repo = SqliteRepo::connect("sqlite::memory:").await.unwrap();
    // more calls than a multi-connection pool would hand to a single connection
    for i in 0..8 {
        repo.insert(new_post("", &format!("m{i}"), "c")).await.unwrap();
    }
    assert_eq!(repo.list_all().await.unwrap().len(), 8);
    assert_eq!(repo.search("m7").await.unwrap().len(), 1);
}

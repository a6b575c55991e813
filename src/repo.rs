use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("validation: {0}")] Validation(String),
    #[error("internal: {0}")] Internal(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            other => RepoError::Internal(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Every post, title ascending; equal titles keep id order.
    async fn list_all(&self) -> RepoResult<Vec<Post>>;
    async fn get_by_id(&self, id: Id) -> RepoResult<Post>;
    /// Case-sensitive substring match on name, title or content.
    /// An empty query matches nothing.
    async fn search(&self, query: &str) -> RepoResult<Vec<Post>>;
    async fn insert(&self, new: NewPost) -> RepoResult<Post>;
}

pub mod inmem {
    use super::*;

    #[derive(Default)]
    struct State {
        posts: Vec<Post>, // kept in id order
        next_id: Id,
    }

    /// Process-local store, used by tests and throwaway runs.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self { Self::default() }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }
    }

    fn poisoned<T>(_: T) -> RepoError { RepoError::Internal("store lock poisoned".into()) }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn list_all(&self) -> RepoResult<Vec<Post>> {
            let s = self.state.read().map_err(poisoned)?;
            let mut v = s.posts.clone();
            v.sort_by(|a, b| a.title.cmp(&b.title)); // stable: ties stay in id order
            Ok(v)
        }

        async fn get_by_id(&self, id: Id) -> RepoResult<Post> {
            let s = self.state.read().map_err(poisoned)?;
            s.posts.iter().find(|p| p.id == id).cloned().ok_or(RepoError::NotFound)
        }

        async fn search(&self, query: &str) -> RepoResult<Vec<Post>> {
            if query.is_empty() { return Ok(Vec::new()); }
            let s = self.state.read().map_err(poisoned)?;
            Ok(s.posts
                .iter()
                .filter(|p| p.name.contains(query) || p.title.contains(query) || p.content.contains(query))
                .cloned()
                .collect())
        }

        async fn insert(&self, new: NewPost) -> RepoResult<Post> {
            new.validate().map_err(RepoError::Validation)?;
            let mut s = self.state.write().map_err(poisoned)?;
            let id = Self::next_id(&mut s);
            let post = Post {
                id,
                name: new.name,
                title: new.title,
                content: new.content,
                image_path: new.image_path,
                likes: 0,
                liked: false,
            };
            s.posts.push(post.clone());
            Ok(post)
        }
    }
}

pub mod sqlite {
    use super::*;
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::SqlitePool;

    const SCHEMA: &str = r#"
        CREATE TABLE IF NOT EXISTS blogs (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       VARCHAR(200) NOT NULL DEFAULT '',
            title      VARCHAR(200) NOT NULL,
            content    TEXT NOT NULL,
            image_path VARCHAR(255),
            likes      INTEGER NOT NULL DEFAULT 0,
            liked      BOOLEAN NOT NULL DEFAULT 0
        )
    "#;

    const COLUMNS: &str = "id, name, title, content, image_path, likes, liked";

    #[derive(Clone)]
    pub struct SqliteRepo { pool: SqlitePool }

    impl SqliteRepo {
        pub fn new(pool: SqlitePool) -> Self { Self { pool } }

        /// Opens (creating if needed) the database file and makes sure the
        /// schema exists. Run once before serving.
        /// In-memory URLs (`sqlite::memory:`, `mode=memory`) get a single
        /// connection: each SQLite connection would otherwise see its own empty
        /// database.
        pub async fn connect(url: &str) -> RepoResult<Self> {
            let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
            let in_memory = url.contains(":memory:") || url.contains("mode=memory");
            let max_connections = if in_memory { 1 } else { 5 };
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                // keep the only connection (and with it the data) alive
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?;
            let repo = Self::new(pool);
            repo.init().await?;
            Ok(repo)
        }

        pub async fn init(&self) -> RepoResult<()> {
            sqlx::query(SCHEMA).execute(&self.pool).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl PostRepo for SqliteRepo {
        async fn list_all(&self) -> RepoResult<Vec<Post>> {
            let recs = sqlx::query_as::<_, Post>(&format!(
                "SELECT {COLUMNS} FROM blogs ORDER BY title COLLATE BINARY ASC, id ASC"
            ))
            .fetch_all(&self.pool)
            .await?;
            Ok(recs)
        }

        async fn get_by_id(&self, id: Id) -> RepoResult<Post> {
            let rec = sqlx::query_as::<_, Post>(&format!("SELECT {COLUMNS} FROM blogs WHERE id = ?1"))
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(rec)
        }

        async fn search(&self, query: &str) -> RepoResult<Vec<Post>> {
            if query.is_empty() { return Ok(Vec::new()); }
            // instr() is case-sensitive, unlike LIKE
            let recs = sqlx::query_as::<_, Post>(&format!(
                "SELECT {COLUMNS} FROM blogs
                 WHERE instr(name, ?1) > 0 OR instr(title, ?1) > 0 OR instr(content, ?1) > 0
                 ORDER BY id ASC"
            ))
            .bind(query)
            .fetch_all(&self.pool)
            .await?;
            Ok(recs)
        }

        async fn insert(&self, new: NewPost) -> RepoResult<Post> {
            new.validate().map_err(RepoError::Validation)?;
            let rec = sqlx::query_as::<_, Post>(&format!(
                "INSERT INTO blogs (name, title, content, image_path) VALUES (?1, ?2, ?3, ?4)
                 RETURNING {COLUMNS}"
            ))
            .bind(&new.name)
            .bind(&new.title)
            .bind(&new.content)
            .bind(new.image_path.as_deref())
            .fetch_one(&self.pool)
            .await?;
            Ok(rec)
        }
    }
}

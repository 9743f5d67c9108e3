use async_trait::async_trait;
use deadpool_diesel::sqlite::{Manager, Pool};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, info};

use super::{LinkStore, StoreError};
use crate::models::{Link, NewLink};
use crate::schema::links;

const CREATE_LINKS: &str = "
    CREATE TABLE IF NOT EXISTS links (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        short_code TEXT NOT NULL UNIQUE,
        original_url TEXT NOT NULL,
        clicks BIGINT NOT NULL DEFAULT 0 CHECK (clicks >= 0)
    );
";

// Pooled connections write concurrently; wait on the file lock instead of
// failing with SQLITE_BUSY. Writes also run in IMMEDIATE transactions so the
// lock is taken up front, where the busy handler applies.
const BUSY_TIMEOUT: &str = "PRAGMA busy_timeout = 5000;";

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                StoreError::Conflict
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Link store backed by a local SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `db_url` and makes sure the
    /// `links` table exists.
    pub async fn open(db_url: &str) -> Result<Self, StoreError> {
        let manager = Manager::new(db_url, deadpool_diesel::Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let store = Self { pool };
        store
            .interact(|conn| conn.batch_execute(CREATE_LINKS))
            .await?;
        info!("sqlite link store ready at {}", db_url);
        Ok(store)
    }

    async fn interact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut SqliteConnection) -> QueryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        conn.interact(move |conn| {
            conn.batch_execute(BUSY_TIMEOUT)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
        .map_err(StoreError::from)
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn insert(&self, link: NewLink<'_>) -> Result<Link, StoreError> {
        let code = link.short_code.to_owned();
        let url = link.original_url.to_owned();
        debug!("inserting link {}", code);

        self.interact(move |conn| {
            let new = NewLink {
                short_code: &code,
                original_url: &url,
            };
            conn.immediate_transaction(|conn| {
                diesel::insert_into(links::table)
                    .values(new)
                    .returning(Link::as_returning())
                    .get_result(conn)
            })
        })
        .await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, StoreError> {
        let code = code.to_owned();
        self.interact(move |conn| {
            use crate::schema::links::dsl::*;
            links
                .filter(short_code.eq(code))
                .select(Link::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn increment_clicks(&self, code: &str) -> Result<Option<Link>, StoreError> {
        let code = code.to_owned();
        self.interact(move |conn| {
            use crate::schema::links::dsl::*;
            conn.immediate_transaction(|conn| {
                diesel::update(links.filter(short_code.eq(code)))
                    .set(clicks.eq(clicks + 1))
                    .returning(Link::as_returning())
                    .get_result(conn)
                    .optional()
            })
        })
        .await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

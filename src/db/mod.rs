use crate::types::ApiError;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{info, warn};
use rocket::request::{self, FromRequest};
use rocket::tokio::task;
use rocket::{Request, State};
use std::time::Duration;

pub mod schema;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// How long `Db::run` waits for a free connection.
pub const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

// An alias to the type for a pool of Diesel SQLite connections.
pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Handle to the connection pool. No connection is held until `run`.
#[derive(Clone)]
pub struct Db(Pool);

error_chain! {
    foreign_links {
        R2D2(r2d2::PoolError);
        Diesel(DieselError);
    }

    errors {
        Migration(reason: String) {
            description("failed to apply database migrations")
            display("failed to apply database migrations: {}", reason)
        }
    }
}

/// Per-connection SQLite settings. Foreign keys are off by default in
/// SQLite, and cascades depend on them.
#[derive(Debug)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> ::std::result::Result<(), r2d2::Error> {
        conn.batch_execute(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;",
        )
        .map_err(r2d2::Error::QueryError)
    }
}

impl Db {
    /// Runs `work` with a pooled connection on the blocking thread pool.
    /// Diesel queries and password hashing belong in here, not on the
    /// async workers. Fails with `Unavailable` when no connection frees up
    /// within `CHECKOUT_TIMEOUT`.
    pub async fn run<F, T>(&self, work: F) -> ::std::result::Result<T, ApiError>
    where
        F: FnOnce(&mut SqliteConnection) -> ::std::result::Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.0.clone();
        task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(|e| {
                warn!("no database connection available: {}", e);
                ApiError::Unavailable
            })?;
            work(&mut *connection)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("database task failed: {}", e)))?
    }
}

/// Hands the managed pool to a route. Fails with `InternalServerError` when
/// no pool is managed.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for Db {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, ()> {
        request
            .guard::<&State<Pool>>()
            .await
            .map(|pool| Db(pool.inner().clone()))
    }
}

pub fn init_pool(database_url: &str) -> Result<Pool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .connection_timeout(CHECKOUT_TIMEOUT)
        .connection_customizer(Box::new(ConnectionPragmas))
        .build(manager)?;
    Ok(pool)
}

pub fn run_migrations(pool: &Pool) -> Result<()> {
    let mut pooled = pool.get()?;
    let connection: &mut SqliteConnection = &mut pooled;
    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| ErrorKind::Migration(e.to_string()))?;
    if !applied.is_empty() {
        info!("applied {} database migration(s)", applied.len());
    }
    Ok(())
}

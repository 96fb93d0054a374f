use anyhow::Result;
use journalgraph::db::{migrate, Db};
use journalgraph::http::HttpServer;
use journalgraph::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "verify" => {
            run_schema_verification().await?;
        }
        "serve" | _ => {
            run_http_server().await?;
        }
    }

    Ok(())
}

/// Run the HTTP server
async fn run_http_server() -> Result<()> {
    log::info!("Starting journalgraph v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let db = init_db(&config).await?;

    let server = HttpServer::new(db, config)?;
    server.run().await?;

    Ok(())
}

/// Run database schema verification
async fn run_schema_verification() -> Result<()> {
    log::info!("Starting journalgraph v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Database path: {}", config.db_path().display());

    let db = init_db(&config).await?;
    verify_database_schema(&db).await?;

    Ok(())
}

/// Open the database and bring the schema up to date.
async fn init_db(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    log::info!("Database initialized successfully");
    Ok(db)
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use journalgraph::JournalGraphError;

    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for table in ["entries", "entry_relations", "schema_migrations"] {
            if !tables.iter().any(|t| t == table) {
                return Err(JournalGraphError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index in ["idx_relations_from", "idx_relations_to", "idx_entries_user"] {
            if !indexes.iter().any(|i| i == index) {
                return Err(JournalGraphError::Config(format!("Missing index: {}", index)));
            }
            log::debug!("✓ Index exists: {}", index);
        }

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(JournalGraphError::Config(format!(
                "Journal mode is not WAL: {}",
                journal_mode
            )));
        }
        log::debug!("✓ Journal mode: WAL");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(JournalGraphError::Config(format!(
                "Database integrity check failed: {}",
                integrity
            )));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    })
    .await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}

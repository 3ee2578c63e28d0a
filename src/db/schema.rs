use rusqlite::Connection;
use std::path::Path;

pub fn init_db(path: &str) -> Result<Connection, rusqlite::Error> {
    if let Some(parent) = Path::new(path).parent() {
        // Missing parent directories surface as an open error below.
        let _ = std::fs::create_dir_all(parent);
    }
    let conn = Connection::open(path)?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Fresh, fully migrated database for tests.
pub fn init_in_memory() -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_in_memory()?;
    apply_schema(&conn)?;
    Ok(conn)
}

pub fn apply_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS admins (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at    DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS journals (
            id         INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            short_name TEXT NOT NULL UNIQUE COLLATE NOCASE
        );

        CREATE TABLE IF NOT EXISTS issues (
            id             INTEGER PRIMARY KEY,
            journal_id     INTEGER NOT NULL REFERENCES journals(id) ON DELETE CASCADE,
            journal_type   TEXT COLLATE NOCASE,
            title          TEXT NOT NULL,
            cover_image    TEXT,
            pdf_file       TEXT,
            published_date TEXT NOT NULL,
            is_current     INTEGER NOT NULL DEFAULT 0
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_issues_one_current_per_type
            ON issues(journal_type) WHERE is_current = 1;
        CREATE INDEX IF NOT EXISTS idx_issues_journal ON issues(journal_id);

        CREATE TABLE IF NOT EXISTS authors (
            id           INTEGER PRIMARY KEY,
            last_name    TEXT NOT NULL,
            first_name   TEXT NOT NULL,
            patronymic   TEXT,
            orcid_id     TEXT,
            organization TEXT,
            position     TEXT
        );

        CREATE TABLE IF NOT EXISTS keywords (
            id   INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS articles (
            id              INTEGER PRIMARY KEY,
            issue_id        INTEGER NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
            doi             TEXT,
            pages           TEXT NOT NULL,
            references_text TEXT,
            article_file    TEXT,
            views           INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_articles_issue ON articles(issue_id);

        CREATE TABLE IF NOT EXISTS article_authors (
            article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            author_id  INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
            PRIMARY KEY (article_id, author_id)
        );

        CREATE TABLE IF NOT EXISTS article_keywords (
            article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
            PRIMARY KEY (article_id, keyword_id)
        );

        CREATE TABLE IF NOT EXISTS article_translations (
            id         INTEGER PRIMARY KEY,
            article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
            language   TEXT NOT NULL CHECK (language IN ('uz', 'ru', 'en')),
            title      TEXT NOT NULL,
            abstract   TEXT NOT NULL,
            UNIQUE (article_id, language)
        );

        CREATE TABLE IF NOT EXISTS board_members (
            id                   INTEGER PRIMARY KEY,
            journal_id           INTEGER NOT NULL REFERENCES journals(id) ON DELETE CASCADE,
            full_name            TEXT NOT NULL,
            position_description TEXT NOT NULL,
            role                 TEXT NOT NULL,
            display_order        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS recent_issue_links (
            id            INTEGER PRIMARY KEY,
            title         TEXT NOT NULL,
            issue_id      INTEGER REFERENCES issues(id) ON DELETE SET NULL,
            display_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS news (
            id         INTEGER PRIMARY KEY,
            title      TEXT NOT NULL,
            content    TEXT NOT NULL,
            image      TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS contact_messages (
            id         INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            email      TEXT NOT NULL,
            subject    TEXT NOT NULL,
            message    TEXT NOT NULL,
            is_read    INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS contact_message_files (
            id          INTEGER PRIMARY KEY,
            message_id  INTEGER NOT NULL REFERENCES contact_messages(id) ON DELETE CASCADE,
            file        TEXT NOT NULL,
            uploaded_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    Ok(())
}

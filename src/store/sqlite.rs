use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Opens (or creates) the SQLite file and switches it to WAL journaling.
pub fn init_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_row| Ok(()))?;
    Ok(conn)
}

/// Opens an existing SQLite file without creating or modifying anything.
pub fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

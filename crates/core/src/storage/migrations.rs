//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Identity and residence schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone_number TEXT,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL
                    CHECK (role IN ('student', 'hall_officer', 'maintenance_officer', 'admin')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Hall officers; the hall they run points back here
            CREATE TABLE IF NOT EXISTS hall_officers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- One officer per hall, enforced by the unique officer reference
            CREATE TABLE IF NOT EXISTS halls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                location TEXT,
                officer_id INTEGER UNIQUE,
                created_at TEXT NOT NULL,
                FOREIGN KEY (officer_id) REFERENCES hall_officers(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS rooms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hall_id INTEGER NOT NULL,
                room_number TEXT NOT NULL,
                floor_number INTEGER,
                capacity INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                FOREIGN KEY (hall_id) REFERENCES halls(id) ON DELETE RESTRICT,
                UNIQUE(hall_id, room_number)
            );

            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                student_number TEXT UNIQUE,
                room_id INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS specialties (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS maintenance_officers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                specialty_id INTEGER NOT NULL,
                employee_number TEXT UNIQUE,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (specialty_id) REFERENCES specialties(id) ON DELETE RESTRICT
            );

            CREATE TABLE IF NOT EXISTS administrators (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                admin_level TEXT NOT NULL DEFAULT 'admin',
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Maintenance request lifecycle schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS statuses (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS maintenance_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                room_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                status_id INTEGER NOT NULL DEFAULT 1,
                description TEXT NOT NULL,
                availability TEXT,
                estimated_cost REAL,
                actual_cost REAL,
                submitted_at TEXT NOT NULL,
                last_updated_at TEXT NOT NULL,
                completed_at TEXT,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE RESTRICT,
                FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE RESTRICT,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE RESTRICT,
                FOREIGN KEY (status_id) REFERENCES statuses(id) ON DELETE RESTRICT,
                -- completed_at is set exactly when the request is Completed
                CHECK ((status_id = 4) = (completed_at IS NOT NULL))
            );

            CREATE TABLE IF NOT EXISTS officer_assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER NOT NULL,
                officer_id INTEGER NOT NULL,
                assigned_at TEXT NOT NULL,
                estimated_completion TEXT,
                notes TEXT,
                FOREIGN KEY (request_id) REFERENCES maintenance_requests(id) ON DELETE CASCADE,
                FOREIGN KEY (officer_id) REFERENCES maintenance_officers(id) ON DELETE CASCADE,
                UNIQUE(request_id, officer_id)
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                action_type TEXT NOT NULL,
                table_affected TEXT,
                record_id INTEGER,
                issue_id INTEGER,
                old_values TEXT,
                new_values TEXT,
                timestamp TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL,
                FOREIGN KEY (issue_id) REFERENCES maintenance_requests(id) ON DELETE SET NULL
            );

            INSERT OR IGNORE INTO statuses (id, name, description) VALUES
                (1, 'Pending', 'Submitted and awaiting triage'),
                (2, 'In Progress', 'Being worked on'),
                (3, 'Under Review', 'Work done, awaiting sign-off'),
                (4, 'Completed', 'Resolved');

            INSERT OR IGNORE INTO categories (name, description) VALUES
                ('Plumbing', 'Taps, pipes, drains and toilets'),
                ('Electrical', 'Sockets, lighting and wiring'),
                ('Carpentry', 'Doors, windows, beds and furniture'),
                ('Cleaning', 'Pest control and sanitation'),
                ('Other', 'Anything else');
        "#,
    },
    Migration {
        version: 3,
        description: "Add indexes for scoped request queries",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_rooms_hall ON rooms(hall_id);
            CREATE INDEX IF NOT EXISTS idx_students_room ON students(room_id);
            CREATE INDEX IF NOT EXISTS idx_requests_student ON maintenance_requests(student_id);
            CREATE INDEX IF NOT EXISTS idx_requests_room ON maintenance_requests(room_id);
            CREATE INDEX IF NOT EXISTS idx_requests_status ON maintenance_requests(status_id);
            CREATE INDEX IF NOT EXISTS idx_requests_submitted ON maintenance_requests(submitted_at);
            CREATE INDEX IF NOT EXISTS idx_assignments_request ON officer_assignments(request_id);
            CREATE INDEX IF NOT EXISTS idx_audit_issue ON audit_log(issue_id);
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }

    #[test]
    fn test_statuses_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let names: Vec<String> = conn
            .prepare("SELECT name FROM statuses ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(
            names,
            vec!["Pending", "In Progress", "Under Review", "Completed"]
        );
    }
}

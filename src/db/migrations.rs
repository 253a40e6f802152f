use color_eyre::Result;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "V1",
        sql: include_str!("../../migrations/V1__init.sql"),
    },
    Migration {
        version: "V2",
        sql: include_str!("../../migrations/V2__add_junction_tables.sql"),
    },
    Migration {
        version: "V3",
        sql: include_str!("../../migrations/V3__add_progress.sql"),
    },
];

pub async fn run(conn: &libsql::Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
        (),
    )
    .await?;

    for migration in MIGRATIONS {
        let already_applied = conn
            .query(
                "SELECT 1 FROM schema_migrations WHERE version = ?",
                libsql::params![migration.version],
            )
            .await?
            .next()
            .await?
            .is_some();

        if already_applied {
            continue;
        }

        conn.execute_batch(migration.sql).await?;

        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            libsql::params![migration.version],
        )
        .await?;

        tracing::info!(version = migration.version, "applied database migration");
    }

    Ok(())
}

use contracts::domain::a001_equipment::aggregate::Equipment;
use contracts::domain::a002_equipment_family::aggregate::EquipmentFamily;
use contracts::domain::common::AggregateRoot;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;

/// Открыть (или создать) файл sqlite и привести схему к актуальной
pub async fn initialize_database(db_file: &Path) -> anyhow::Result<DatabaseConnection> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);

    tracing::info!("Opening database {}", absolute_path.display());
    let conn = Database::connect(&db_url).await?;
    bootstrap_schema(&conn).await?;
    Ok(conn)
}

/// Создать недостающие таблицы
pub async fn bootstrap_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    let equipment_table = Equipment::full_name();
    let family_table = EquipmentFamily::full_name();

    ensure_table(
        conn,
        &equipment_table,
        &format!(
            r#"
            CREATE TABLE {equipment_table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id INTEGER NOT NULL UNIQUE,
                post_type TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                meta_json TEXT NOT NULL DEFAULT '{{}}',
                media_json TEXT NOT NULL DEFAULT '[]',
                content_hash TEXT NOT NULL,
                is_bandit_feed INTEGER NOT NULL DEFAULT 1,
                sort INTEGER NOT NULL DEFAULT 999,
                created_at TEXT,
                updated_at TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );
            "#
        ),
    )
    .await?;

    ensure_table(
        conn,
        &family_table,
        &format!(
            r#"
            CREATE TABLE {family_table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                taxonomy TEXT NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                parent_id INTEGER NOT NULL DEFAULT 0,
                external_category_id INTEGER,
                created_at TEXT,
                updated_at TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                UNIQUE (taxonomy, name)
            );
            "#
        ),
    )
    .await?;

    let link_table = format!("{}_family_link", equipment_table);
    ensure_table(
        conn,
        &link_table,
        &format!(
            r#"
            CREATE TABLE {link_table} (
                equipment_id INTEGER NOT NULL,
                family_id INTEGER NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (equipment_id, family_id)
            );
            "#
        ),
    )
    .await?;

    ensure_table(
        conn,
        "sys_option",
        r#"
        CREATE TABLE sys_option (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    ensure_table(
        conn,
        "sys_transient",
        r#"
        CREATE TABLE sys_transient (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        "#,
    )
    .await?;

    Ok(())
}

async fn ensure_table(conn: &DatabaseConnection, name: &str, create_sql: &str) -> anyhow::Result<()> {
    let existing = conn
        .query_all(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?;",
            [name.into()],
        ))
        .await?;

    if existing.is_empty() {
        tracing::info!("Creating {} table", name);
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_sql.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// In-memory database with the full schema, for tests
#[cfg(test)]
pub async fn test_connection() -> DatabaseConnection {
    use sea_orm::ConnectOptions;

    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opt).await.unwrap();
    bootstrap_schema(&conn).await.unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let conn = test_connection().await;
        bootstrap_schema(&conn).await.unwrap();

        let rows = conn
            .query_all(Statement::from_string(
                DatabaseBackend::Sqlite,
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name;".to_string(),
            ))
            .await
            .unwrap();
        let names: Vec<String> = rows
            .iter()
            .map(|r| r.try_get::<String>("", "name").unwrap())
            .filter(|n| !n.starts_with("sqlite_"))
            .collect();
        assert_eq!(
            names,
            vec![
                "a001_equipment",
                "a001_equipment_family_link",
                "a002_equipment_family",
                "sys_option",
                "sys_transient",
            ]
        );
    }
}

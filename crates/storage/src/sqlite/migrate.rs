use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS workouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            plan_index INTEGER NOT NULL DEFAULT 0 CHECK (plan_index >= 0),
            created_at TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            name TEXT NOT NULL,
            UNIQUE (workout_id, position),
            FOREIGN KEY (workout_id) REFERENCES workouts(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS exercise_sets (
            exercise_id INTEGER NOT NULL,
            set_index INTEGER NOT NULL CHECK (set_index >= 0),
            weight REAL CHECK (weight IS NULL OR weight >= 0),
            reps INTEGER CHECK (reps IS NULL OR reps >= 0),
            is_complete INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (exercise_id, set_index),
            FOREIGN KEY (exercise_id) REFERENCES exercises(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS template_exercises (
            template_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            name TEXT NOT NULL,
            sets INTEGER NOT NULL CHECK (sets >= 1),
            reps INTEGER NOT NULL CHECK (reps >= 1),
            PRIMARY KEY (template_id, position),
            FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS app_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            weight_unit TEXT NOT NULL,
            show_timer INTEGER NOT NULL,
            theme TEXT NOT NULL,
            enable_haptic INTEGER NOT NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_workouts_created_at
            ON workouts (created_at, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_exercises_name_workout
            ON exercises (name, workout_id);
    ",
];

/// Runs the versioned migrations for the current schema.
///
/// Version 1 creates workouts with their exercises and sets, templates,
/// the single-row settings table and the lookup indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}

use lift_core::model::{Template, TemplateExercise, TemplateId};
use sqlx::{Row, Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, ser, template_id_from_i64, u32_from_i64};
use crate::repository::{StorageError, TemplateRepository};

async fn insert_exercises(
    tx: &mut Transaction<'_, Sqlite>,
    template_id: i64,
    template: &Template,
) -> Result<(), StorageError> {
    for exercise in template.exercises() {
        sqlx::query(
            r"
            INSERT INTO template_exercises (template_id, position, name, sets, reps)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(template_id)
        .bind(i64::from(exercise.index()))
        .bind(exercise.name())
        .bind(i64::from(exercise.sets()))
        .bind(i64::from(exercise.reps()))
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

impl SqliteRepository {
    async fn load_template(&self, raw_id: i64, title: String) -> Result<Template, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT position, name, sets, reps
            FROM template_exercises
            WHERE template_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut exercises = Vec::with_capacity(rows.len());
        let mut positions = Vec::with_capacity(rows.len());
        for row in &rows {
            positions.push(u32_from_i64("position", row.try_get("position").map_err(ser)?)?);
            exercises.push(
                TemplateExercise::new(
                    row.try_get::<String, _>("name").map_err(ser)?,
                    u32_from_i64("sets", row.try_get("sets").map_err(ser)?)?,
                    u32_from_i64("reps", row.try_get("reps").map_err(ser)?)?,
                )
                .map_err(ser)?,
            );
        }

        Template::from_persisted(template_id_from_i64(raw_id)?, title, exercises, &positions)
            .map_err(ser)
    }
}

#[async_trait::async_trait]
impl TemplateRepository for SqliteRepository {
    async fn insert_template(&self, template: &Template) -> Result<TemplateId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let res = sqlx::query("INSERT INTO templates (title) VALUES (?1)")
            .bind(template.title())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        let raw_id = res.last_insert_rowid();

        insert_exercises(&mut tx, raw_id, template).await?;
        tx.commit().await.map_err(conn)?;
        template_id_from_i64(raw_id)
    }

    async fn upsert_template(&self, template: &Template) -> Result<(), StorageError> {
        let raw_id = id_to_i64(template.id().ok_or(StorageError::MissingId)?.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query("UPDATE templates SET title = ?2 WHERE id = ?1")
            .bind(raw_id)
            .bind(template.title())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        sqlx::query("DELETE FROM template_exercises WHERE template_id = ?1")
            .bind(raw_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        insert_exercises(&mut tx, raw_id, template).await?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_template(&self, id: TemplateId) -> Result<Option<Template>, StorageError> {
        let raw_id = id_to_i64(id.value())?;
        let title: Option<String> = sqlx::query_scalar("SELECT title FROM templates WHERE id = ?1")
            .bind(raw_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match title {
            Some(title) => self.load_template(raw_id, title).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_templates(&self) -> Result<Vec<Template>, StorageError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, title FROM templates ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;

        let mut templates = Vec::with_capacity(rows.len());
        for (raw_id, title) in rows {
            templates.push(self.load_template(raw_id, title).await?);
        }
        Ok(templates)
    }

    async fn delete_template(&self, id: TemplateId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM templates WHERE id = ?1")
            .bind(id_to_i64(id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

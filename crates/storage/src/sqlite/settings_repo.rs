use async_trait::async_trait;
use sqlx::Row;

use lift_core::model::{Theme, WeightUnit, WorkoutSettings};

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{SettingsRepository, StorageError};

#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_settings(&self) -> Result<Option<WorkoutSettings>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT weight_unit, show_timer, theme, enable_haptic
            FROM app_settings
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let weight_unit: String = row.try_get("weight_unit").map_err(ser)?;
        let theme: String = row.try_get("theme").map_err(ser)?;
        let show_timer: i64 = row.try_get("show_timer").map_err(ser)?;
        let enable_haptic: i64 = row.try_get("enable_haptic").map_err(ser)?;

        Ok(Some(WorkoutSettings {
            weight_unit: weight_unit.parse::<WeightUnit>().map_err(ser)?,
            show_timer: show_timer != 0,
            theme: theme.parse::<Theme>().map_err(ser)?,
            enable_haptic: enable_haptic != 0,
        }))
    }

    async fn save_settings(&self, settings: &WorkoutSettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO app_settings (id, weight_unit, show_timer, theme, enable_haptic)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                weight_unit = excluded.weight_unit,
                show_timer = excluded.show_timer,
                theme = excluded.theme,
                enable_haptic = excluded.enable_haptic
            ",
        )
        .bind(1_i64)
        .bind(settings.weight_unit.as_str())
        .bind(i64::from(settings.show_timer))
        .bind(settings.theme.as_str())
        .bind(i64::from(settings.enable_haptic))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}

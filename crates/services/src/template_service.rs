use std::sync::Arc;

use lift_core::model::{Template, TemplateError, TemplateExercise, TemplateId};
use storage::repository::{StorageError, TemplateRepository};

use crate::error::TemplateServiceError;

/// Creates and edits reusable workout templates.
#[derive(Clone)]
pub struct TemplateService {
    templates: Arc<dyn TemplateRepository>,
}

impl TemplateService {
    #[must_use]
    pub fn new(templates: Arc<dyn TemplateRepository>) -> Self {
        Self { templates }
    }

    /// Create and persist a template with the given exercises, in order.
    ///
    /// # Errors
    ///
    /// Returns `TemplateServiceError::Template` for an empty title, or
    /// `TemplateServiceError::Storage` if persistence fails.
    pub async fn create(
        &self,
        title: &str,
        exercises: Vec<TemplateExercise>,
    ) -> Result<Template, TemplateServiceError> {
        let mut template = Template::new(title)?;
        for exercise in exercises {
            template.add_exercise(exercise);
        }
        let id = self.templates.insert_template(&template).await?;
        template.assign_id(id);
        tracing::info!(%id, title = template.title(), "template created");
        Ok(template)
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError::Storage` if repository access fails.
    pub async fn get(&self, id: TemplateId) -> Result<Option<Template>, TemplateServiceError> {
        Ok(self.templates.get_template(id).await?)
    }

    /// All templates ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `TemplateServiceError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<Template>, TemplateServiceError> {
        Ok(self.templates.list_templates().await?)
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError` for an empty title or storage failures.
    pub async fn rename(&self, id: TemplateId, title: &str) -> Result<Template, TemplateServiceError> {
        self.edit(id, |t| t.rename(title)).await
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError::Storage` for an unknown template or
    /// storage failures.
    pub async fn add_exercise(
        &self,
        id: TemplateId,
        exercise: TemplateExercise,
    ) -> Result<Template, TemplateServiceError> {
        self.edit(id, |t| {
            t.add_exercise(exercise);
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError` for invalid targets, an unknown
    /// position, or storage failures.
    pub async fn update_exercise(
        &self,
        id: TemplateId,
        index: usize,
        sets: u32,
        reps: u32,
    ) -> Result<Template, TemplateServiceError> {
        self.edit(id, |t| t.update_exercise(index, sets, reps)).await
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError` for an unknown position or storage failures.
    pub async fn remove_exercise(
        &self,
        id: TemplateId,
        index: usize,
    ) -> Result<Template, TemplateServiceError> {
        self.edit(id, |t| t.remove_exercise(index).map(|_| ())).await
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError` for unknown positions or storage failures.
    pub async fn move_exercise(
        &self,
        id: TemplateId,
        from: usize,
        to: usize,
    ) -> Result<Template, TemplateServiceError> {
        self.edit(id, |t| t.move_exercise(from, to)).await
    }

    /// # Errors
    ///
    /// Returns `TemplateServiceError::Storage` if the template does not exist
    /// or the delete fails.
    pub async fn delete(&self, id: TemplateId) -> Result<(), TemplateServiceError> {
        self.templates.delete_template(id).await?;
        tracing::info!(%id, "template deleted");
        Ok(())
    }

    async fn edit<F>(&self, id: TemplateId, apply: F) -> Result<Template, TemplateServiceError>
    where
        F: FnOnce(&mut Template) -> Result<(), TemplateError> + Send,
    {
        let mut template = self
            .templates
            .get_template(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        apply(&mut template)?;
        self.templates.upsert_template(&template).await?;
        Ok(template)
    }
}

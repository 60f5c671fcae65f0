use crate::models::Tag;
use crate::repository::TagRepository;

use super::ServiceError;

pub struct TagService<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R: TagRepository + ?Sized> TagService<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    pub fn create_tag(&self, name: String) -> Result<Tag, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "Tag name cannot be blank".to_string(),
            ));
        }
        let saved = self.repo.insert_tag(&Tag::new(name))?;
        tracing::info!(tag_id = ?saved.id, name = %saved.name, "tag created");
        Ok(saved)
    }

    pub fn get_tag(&self, id: i64) -> Result<Tag, ServiceError> {
        self.repo
            .find_tag(id)?
            .ok_or_else(|| ServiceError::tag_not_found(id))
    }

    pub fn get_all_tags(&self) -> Result<Vec<Tag>, ServiceError> {
        Ok(self.repo.find_all_tags()?)
    }

    /// Remove a tag, returning its state before deletion
    pub fn delete_tag(&self, id: i64) -> Result<Tag, ServiceError> {
        let tag = self.get_tag(id)?;
        self.repo.delete_tag(id)?;
        tracing::info!(tag_id = id, "tag deleted");
        Ok(tag)
    }
}

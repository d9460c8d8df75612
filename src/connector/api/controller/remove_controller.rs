use anyhow::Result;

use super::super::Container;

pub struct RemoveController<'a> {
    container: &'a Container,
}

impl<'a> RemoveController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn remove(&self, name: String) -> Result<String> {
        self.container.client().remove(&name).await?;
        Ok(format!("Collection '{}' removed.", name))
    }
}

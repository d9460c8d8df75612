use anyhow::Result;

use crate::Commands;

use super::container::Container;
use super::controller::{
    AddController, ListCollectionsController, ReadController, RemoveController, StatsController,
};

pub struct Router<'a> {
    add_controller: AddController<'a>,
    list_collections_controller: ListCollectionsController<'a>,
    remove_controller: RemoveController<'a>,
    read_controller: ReadController<'a>,
    stats_controller: StatsController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            add_controller: AddController::new(container),
            list_collections_controller: ListCollectionsController::new(container),
            remove_controller: RemoveController::new(container),
            read_controller: ReadController::new(container),
            stats_controller: StatsController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Add { paths, name, ext } => self.add_controller.add(paths, name, ext).await,
            Commands::List => self.list_collections_controller.list().await,
            Commands::Remove { name } => self.remove_controller.remove(name).await,
            Commands::Read {
                name,
                from,
                to,
                grep,
                json,
            } => self.read_controller.read(name, from, to, grep, json).await,
            Commands::Similar {
                name,
                text,
                top,
                json,
            } => self.read_controller.similar(name, text, top, json).await,
            Commands::Blob { name } => self.read_controller.blob(name).await,
            Commands::Raw { name } => self.read_controller.raw(name).await,
            Commands::Stats => self.stats_controller.stats().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::api::ContainerConfig;
    use crate::BackendKind;

    async fn memory_container() -> Container {
        Container::new(ContainerConfig {
            backend: BackendKind::InMemory,
            ..ContainerConfig::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn add_then_read_through_router() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mayon.txt");
        std::fs::write(&path, "Sun is hot. It is bright. Mayon is a volcano.").unwrap();

        let container = memory_container().await;
        let router = Router::new(&container);

        let added = router
            .route(Commands::Add {
                paths: vec![path.to_string_lossy().to_string()],
                name: None,
                ext: vec!["txt".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(added, "Added collection: mayon (3 sentences)");

        let read = router
            .route(Commands::Read {
                name: "mayon".to_string(),
                from: Some(1),
                to: None,
                grep: None,
                json: false,
            })
            .await
            .unwrap();
        assert_eq!(read, "1\tIt is bright.\n2\tMayon is a volcano.");

        let blob = router
            .route(Commands::Blob {
                name: "mayon".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(blob, "Sun is hot. It is bright. Mayon is a volcano.");

        let json = router
            .route(Commands::Read {
                name: "mayon".to_string(),
                from: None,
                to: None,
                grep: Some("volcano".to_string()),
                json: true,
            })
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{"n": 2, "sent": "Mayon is a volcano."}])
        );
    }

    #[tokio::test]
    async fn similar_ranks_closest_sentence_first() {
        let container = memory_container().await;
        container
            .client()
            .add_text("mayon", "Sun is hot. It is bright. Mayon is a volcano.")
            .await
            .unwrap();
        let router = Router::new(&container);

        let out = router
            .route(Commands::Similar {
                name: "mayon".to_string(),
                text: "an active volcano".to_string(),
                top: 1,
                json: false,
            })
            .await
            .unwrap();
        assert_eq!(out, "2\tMayon is a volcano.");
    }

    #[tokio::test]
    async fn name_requires_single_path() {
        let container = memory_container().await;
        let router = Router::new(&container);

        let err = router
            .route(Commands::Add {
                paths: vec!["a.txt".to_string(), "b.txt".to_string()],
                name: Some("both".to_string()),
                ext: vec!["txt".to_string()],
            })
            .await
            .unwrap_err();
        let domain = err.downcast_ref::<crate::DomainError>().unwrap();
        assert!(domain.is_invalid_input());
    }

    #[tokio::test]
    async fn list_and_stats_on_empty_corpus() {
        let container = memory_container().await;
        let router = Router::new(&container);

        assert_eq!(
            router.route(Commands::List).await.unwrap(),
            "No collections in corpus 'corpus'."
        );
        let stats = router.route(Commands::Stats).await.unwrap();
        assert!(stats.contains("Collections:     0"));
        assert!(stats.contains("Backend:         memory"));
    }

    #[tokio::test]
    async fn remove_missing_collection_fails() {
        let container = memory_container().await;
        let router = Router::new(&container);

        let err = router
            .route(Commands::Remove {
                name: "ghost".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err
            .downcast_ref::<crate::DomainError>()
            .unwrap()
            .is_not_found());
    }
}

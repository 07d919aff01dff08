use crate::{
    config::Config,
    error::Result,
    ml::OpenAiEmbedder,
    routes::api_routes,
    services::{
        ChromaCollection, OpenAiChatClient, ProfanityFilter, RecommendationOptions,
        RecommendationService, Retriever, SummaryIndex,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use std::{net::TcpListener, sync::Arc};

/// Wire the recommendation service from configuration.
///
/// The summary source is always loaded. The model backend is only built when
/// the API credential is present; without it every query gets the
/// missing-key reply instead of an error.
pub async fn build_recommendation_service(config: &Config) -> Result<RecommendationService> {
    let summaries = Arc::new(SummaryIndex::load(&config.data_path)?);
    info!("Loaded {} book summaries", summaries.len());

    let service = match config.openai_api_key {
        Some(_) => {
            let embedder = Arc::new(OpenAiEmbedder::from_config(config)?);
            let store = Arc::new(ChromaCollection::from_config(config).await?);
            let chat = Arc::new(OpenAiChatClient::from_config(config)?);
            RecommendationService::new(Retriever::new(embedder, store), chat, summaries)
        }
        None => {
            warn!("OPENAI_API_KEY is not set; recommendations are disabled");
            RecommendationService::without_backend(summaries)
        }
    };

    if config.moderation_enabled {
        let filter = ProfanityFilter::from_config(config).await?;
        Ok(service.with_moderation(Arc::new(filter)))
    } else {
        Ok(service)
    }
}

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let recommendation_service =
            web::Data::new(build_recommendation_service(&self.config).await?);
        let defaults = web::Data::new(RecommendationOptions::from_config(&self.config));

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(recommendation_service.clone())
                .app_data(defaults.clone())
                .service(api_routes())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::fs;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_data(dir: &tempfile::TempDir) -> Config {
        let data_path = dir.path().join("books.json");
        fs::write(&data_path, r#"{"1984": "Big Brother."}"#).unwrap();
        let mut config = Config::for_tests();
        config.data_path = data_path;
        config
    }

    #[tokio::test]
    async fn test_without_key_serves_summaries_only() {
        let dir = tempfile::tempdir().unwrap();
        let service = build_recommendation_service(&config_with_data(&dir))
            .await
            .unwrap();
        assert!(service.retriever().is_none());
        assert_eq!(service.summaries().len(), 1);
    }

    #[tokio::test]
    async fn test_chroma_failure_stays_an_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("chroma down"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_data(&dir);
        config.openai_api_key = Some("sk-test".to_string());
        config.chroma_url = server.uri();

        match build_recommendation_service(&config).await {
            Err(AppError::ExternalServiceError(msg)) => assert!(msg.contains("chroma down")),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected the Chroma connection to fail"),
        }
    }
}

use crate::{
    error::AppError,
    models::{RecommendationRequest, RetrieveRequest, RetrieveResponse},
    services::{RecommendationOptions, RecommendationService},
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use log::info;

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recommendations").route(web::post().to(get_recommendation)))
        .service(web::resource("/retrieve").route(web::post().to(retrieve)));
}

/// Pick one book for the query and attach its detailed summary
pub async fn get_recommendation(
    request: Json<RecommendationRequest>,
    recommendation_service: web::Data<RecommendationService>,
    defaults: web::Data<RecommendationOptions>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();

    if request.query.trim().is_empty() {
        return Err(AppError::InvalidInput("Query cannot be empty".to_string()));
    }

    let options = RecommendationOptions {
        top_k: request.top_k.unwrap_or(defaults.top_k),
        model: request.model.unwrap_or_else(|| defaults.model.clone()),
        temperature: request.temperature.unwrap_or(defaults.temperature),
    };
    if !(0.0..=2.0).contains(&options.temperature) {
        return Err(AppError::InvalidInput(
            "temperature must be within 0.0..=2.0".to_string(),
        ));
    }

    let result = recommendation_service
        .recommend(&request.query, &options)
        .await?;

    info!(
        "Recommendation served: {} candidates, title {:?}",
        result.hits.len(),
        result.extracted_title()
    );

    Ok(HttpResponse::Ok().json(result))
}

/// Nearest candidates for the query, without the chat step
pub async fn retrieve(
    request: Json<RetrieveRequest>,
    recommendation_service: web::Data<RecommendationService>,
    defaults: web::Data<RecommendationOptions>,
) -> Result<HttpResponse, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::InvalidInput("Query cannot be empty".to_string()));
    }

    let retriever = recommendation_service.retriever().ok_or_else(|| {
        AppError::MissingCredential("OPENAI_API_KEY is required for retrieval".to_string())
    })?;

    let hits = retriever
        .retrieve(request.query.trim(), request.top_k.unwrap_or(defaults.top_k))
        .await?;

    Ok(HttpResponse::Ok().json(RetrieveResponse { hits }))
}

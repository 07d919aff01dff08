use crate::{models::SummaryResponse, services::RecommendationService};
use actix_web::{get, web, HttpResponse};

/// Detailed summary for a title; unknown titles get the "not found" sentence.
#[get("/summaries/{title}")]
pub async fn get_summary(
    title: web::Path<String>,
    recommendation_service: web::Data<RecommendationService>,
) -> HttpResponse {
    let title = title.into_inner();
    let summaries = recommendation_service.summaries();

    HttpResponse::Ok().json(SummaryResponse {
        found: summaries.get(&title).is_some(),
        summary: summaries.get_summary_by_title(&title).to_string(),
        title,
    })
}

use crate::routes::{chat, dreams, health};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "dream-server",
    description = "Dream interpretation, pattern analysis and follow-up chat backed by an OpenAI-compatible model"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(dreams::DreamsApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root
}

use serde::{Deserialize, Serialize};
use services::{ChatTurn, TutorReply};
use study_core::model::CourseId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorRequest {
    pub message: String,
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct TutorResponse {
    pub reply: String,
    pub model: String,
}

impl From<TutorReply> for TutorResponse {
    fn from(reply: TutorReply) -> Self {
        Self {
            reply: reply.reply,
            model: reply.model,
        }
    }
}

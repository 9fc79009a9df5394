//! Client for the study-assistant service: quiz generation and scoring,
//! flashcards from an uploaded document, learning roadmaps, and the chatbot.
//!
//! The HTTP transport sits behind [`AssistantApi`] so embedders can swap in
//! their own backend and tests can script responses, mirroring the seam the
//! moderation pipeline has.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::studyspace::Studyspace;
use crate::studyspace::error::{Result, StudyspaceError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question_number: u32,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub subject: String,
    pub chapter: String,
    pub marks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResponse {
    pub response: QuizQuestions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestions {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub user_id: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub total_marks: u32,
    pub obtained_marks: u32,
    pub overall_percentage: f64,
    #[serde(default)]
    pub subject_analysis: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub chapter_analysis: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub description: String,
    pub duration: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
struct FlashcardsResponse {
    #[serde(default)]
    flashcards: Vec<Flashcard>,
}

#[derive(Deserialize)]
struct RoadmapResponse {
    #[serde(default)]
    roadmap: Vec<Milestone>,
    error: Option<String>,
}

#[derive(Serialize)]
struct QuizRequest<'a> {
    prompt: &'a str,
    user_id: String,
    num_questions: u32,
}

#[derive(Serialize)]
struct EvaluateQuizRequest<'a> {
    quiz_response: &'a QuizResponse,
    user_answers: &'a HashMap<u32, String>,
    user_id: String,
}

#[derive(Serialize)]
struct RoadmapRequest<'a> {
    user_id: String,
    prompt: &'a str,
}

#[derive(Serialize)]
struct ChatbotParams {
    user_id: String,
}

#[derive(Serialize)]
struct ChatbotRequest<'a> {
    text: &'a str,
    params: ChatbotParams,
}

#[derive(Deserialize)]
struct ChatbotReply {
    generated_text: String,
}

#[derive(Deserialize)]
struct ChatbotResponse {
    response: ChatbotReply,
}

/// The assistant service's operations.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn generate_quiz(
        &self,
        prompt: &str,
        user_id: &Uuid,
        num_questions: u32,
    ) -> Result<QuizResponse>;

    async fn evaluate_quiz(
        &self,
        quiz: &QuizResponse,
        answers: &HashMap<u32, String>,
        user_id: &Uuid,
    ) -> Result<QuizResult>;

    async fn generate_flashcards(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        user_id: &Uuid,
    ) -> Result<Vec<Flashcard>>;

    async fn generate_roadmap(&self, prompt: &str, user_id: &Uuid) -> Result<Vec<Milestone>>;

    async fn send_chatbot_message(&self, text: &str, user_id: &Uuid) -> Result<String>;
}

/// Production [`AssistantApi`] speaking the service's JSON/multipart
/// endpoints.
pub struct HttpAssistantClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssistantClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StudyspaceError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| StudyspaceError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StudyspaceError::ExternalService(format!(
                "assistant returned {} for {}",
                response.status(),
                path
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StudyspaceError::ExternalService(e.to_string()))
    }
}

#[async_trait]
impl AssistantApi for HttpAssistantClient {
    async fn generate_quiz(
        &self,
        prompt: &str,
        user_id: &Uuid,
        num_questions: u32,
    ) -> Result<QuizResponse> {
        self.post_json(
            "/quiz",
            &QuizRequest {
                prompt,
                user_id: user_id.to_string(),
                num_questions,
            },
        )
        .await
    }

    async fn evaluate_quiz(
        &self,
        quiz: &QuizResponse,
        answers: &HashMap<u32, String>,
        user_id: &Uuid,
    ) -> Result<QuizResult> {
        self.post_json(
            "/evaluate-quiz",
            &EvaluateQuizRequest {
                quiz_response: quiz,
                user_answers: answers,
                user_id: user_id.to_string(),
            },
        )
        .await
    }

    /// Uploads a document and returns the flashcards generated from it.
    /// Cards missing a question or answer are dropped; an all-empty result is
    /// an error rather than an empty deck.
    async fn generate_flashcards(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        user_id: &Uuid,
    ) -> Result<Vec<Flashcard>> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| StudyspaceError::ExternalService(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("user_id", user_id.to_string());

        let response = self
            .client
            .post(format!("{}/flashcards", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| StudyspaceError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StudyspaceError::ExternalService(format!(
                "assistant returned {} for /flashcards",
                response.status()
            )));
        }

        let payload = response
            .json::<FlashcardsResponse>()
            .await
            .map_err(|e| StudyspaceError::ExternalService(e.to_string()))?;

        let cards: Vec<Flashcard> = payload
            .flashcards
            .into_iter()
            .filter(|card| !card.question.is_empty() && !card.answer.is_empty())
            .collect();

        if cards.is_empty() {
            return Err(StudyspaceError::ExternalService(
                "assistant returned no usable flashcards".to_string(),
            ));
        }
        Ok(cards)
    }

    async fn generate_roadmap(&self, prompt: &str, user_id: &Uuid) -> Result<Vec<Milestone>> {
        let payload: RoadmapResponse = self
            .post_json(
                "/portfolio/roadmap",
                &RoadmapRequest {
                    user_id: user_id.to_string(),
                    prompt,
                },
            )
            .await?;

        if let Some(error) = payload.error {
            return Err(StudyspaceError::ExternalService(error));
        }
        if payload.roadmap.is_empty() {
            return Err(StudyspaceError::ExternalService(
                "assistant returned an empty roadmap".to_string(),
            ));
        }
        Ok(payload.roadmap)
    }

    async fn send_chatbot_message(&self, text: &str, user_id: &Uuid) -> Result<String> {
        let payload: ChatbotResponse = self
            .post_json(
                "/chatbot",
                &ChatbotRequest {
                    text,
                    params: ChatbotParams {
                        user_id: user_id.to_string(),
                    },
                },
            )
            .await?;

        let reply = payload.response.generated_text.trim().to_string();
        if reply.is_empty() {
            return Err(StudyspaceError::ExternalService(
                "assistant returned an empty reply".to_string(),
            ));
        }
        Ok(reply)
    }
}

impl Studyspace {
    /// Generates a quiz from a free-text prompt.
    pub async fn generate_quiz(
        &self,
        prompt: &str,
        user_id: &Uuid,
        num_questions: u32,
    ) -> Result<QuizResponse> {
        self.assistant
            .generate_quiz(prompt, user_id, num_questions)
            .await
    }

    /// Scores a completed quiz. `answers` maps question number to the chosen
    /// option.
    pub async fn evaluate_quiz(
        &self,
        quiz: &QuizResponse,
        answers: &HashMap<u32, String>,
        user_id: &Uuid,
    ) -> Result<QuizResult> {
        self.assistant.evaluate_quiz(quiz, answers, user_id).await
    }

    /// Generates flashcards from one of the user's uploaded documents.
    pub async fn generate_flashcards(
        &self,
        document_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Vec<Flashcard>> {
        let document = crate::studyspace::documents::Document::find_by_id(
            document_id,
            &self.database,
        )
        .await?
        .ok_or(StudyspaceError::DocumentNotFound)?;
        let bytes = self.storage.load(&document.stored_name).await?;
        self.assistant
            .generate_flashcards(&document.file_name, bytes, user_id)
            .await
    }

    /// Generates a learning roadmap from a free-text prompt.
    pub async fn generate_roadmap(&self, prompt: &str, user_id: &Uuid) -> Result<Vec<Milestone>> {
        self.assistant.generate_roadmap(prompt, user_id).await
    }

    /// Sends a message to the chatbot and returns its reply.
    pub async fn send_chatbot_message(&self, text: &str, user_id: &Uuid) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StudyspaceError::Validation(
                "message cannot be empty".to_string(),
            ));
        }
        self.assistant.send_chatbot_message(text, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_response_deserializes_service_payload() {
        let payload = r#"{
            "response": {
                "questions": [{
                    "question_number": 1,
                    "question": "What is a binary heap?",
                    "options": ["A tree", "A list", "A graph", "A map"],
                    "answer": "A tree",
                    "subject": "Data Structures",
                    "chapter": "Heaps",
                    "marks": 2
                }]
            }
        }"#;

        let quiz: QuizResponse = serde_json::from_str(payload).unwrap();

        assert_eq!(quiz.response.questions.len(), 1);
        let q = &quiz.response.questions[0];
        assert_eq!(q.question_number, 1);
        assert_eq!(q.options.len(), 4);
        assert_eq!(q.marks, 2);
    }

    #[test]
    fn quiz_result_tolerates_missing_analysis_sections() {
        let payload = r#"{
            "user_id": "u1",
            "total_questions": 5,
            "correct_answers": 4,
            "total_marks": 10,
            "obtained_marks": 8,
            "overall_percentage": 80.0
        }"#;

        let result: QuizResult = serde_json::from_str(payload).unwrap();

        assert_eq!(result.correct_answers, 4);
        assert!(result.subject_analysis.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn flashcards_response_drops_unusable_cards() {
        let payload = r#"{
            "flashcards": [
                {"question": "Q1", "answer": "A1", "topic": "T"},
                {"question": "", "answer": "A2"},
                {"question": "Q3", "answer": ""}
            ]
        }"#;

        let response: FlashcardsResponse = serde_json::from_str(payload).unwrap();
        let usable: Vec<_> = response
            .flashcards
            .into_iter()
            .filter(|card| !card.question.is_empty() && !card.answer.is_empty())
            .collect();

        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].question, "Q1");
    }

    #[test]
    fn roadmap_response_carries_service_error() {
        let payload = r#"{"roadmap": [], "error": "No roadmap data generated"}"#;

        let response: RoadmapResponse = serde_json::from_str(payload).unwrap();

        assert_eq!(response.error.as_deref(), Some("No roadmap data generated"));
        assert!(response.roadmap.is_empty());
    }

    #[test]
    fn milestone_optional_fields_deserialize() {
        let payload = r#"{"title": "Week 1", "description": "Basics"}"#;

        let milestone: Milestone = serde_json::from_str(payload).unwrap();

        assert_eq!(milestone.title, "Week 1");
        assert!(milestone.duration.is_none());
        assert!(milestone.status.is_none());
    }

    #[test]
    fn quiz_request_serializes_expected_shape() {
        let request = QuizRequest {
            prompt: "heaps",
            user_id: "u1".to_string(),
            num_questions: 5,
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["prompt"], "heaps");
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["num_questions"], 5);
    }

    #[test]
    fn chatbot_request_nests_user_id_under_params() {
        let request = ChatbotRequest {
            text: "explain recursion",
            params: ChatbotParams {
                user_id: "u1".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["text"], "explain recursion");
        assert_eq!(json["params"]["user_id"], "u1");
    }

    #[test]
    fn chatbot_response_deserializes_service_payload() {
        let payload = r#"{"response": {"generated_text": "Recursion is...", "params": "x"}}"#;

        let response: ChatbotResponse = serde_json::from_str(payload).unwrap();

        assert_eq!(response.response.generated_text, "Recursion is...");
    }

    mod facade {
        use std::sync::{Arc, Mutex};

        use super::*;
        use crate::studyspace::test_utils::*;

        /// Scripted backend recording what the facade hands it.
        #[derive(Default)]
        struct ScriptedAssistant {
            flashcards_input: Mutex<Option<(String, Vec<u8>)>>,
        }

        #[async_trait]
        impl AssistantApi for ScriptedAssistant {
            async fn generate_quiz(
                &self,
                _prompt: &str,
                _user_id: &Uuid,
                _num_questions: u32,
            ) -> Result<QuizResponse> {
                Ok(QuizResponse {
                    response: QuizQuestions { questions: vec![] },
                })
            }

            async fn evaluate_quiz(
                &self,
                _quiz: &QuizResponse,
                _answers: &HashMap<u32, String>,
                user_id: &Uuid,
            ) -> Result<QuizResult> {
                Ok(QuizResult {
                    user_id: user_id.to_string(),
                    total_questions: 0,
                    correct_answers: 0,
                    total_marks: 0,
                    obtained_marks: 0,
                    overall_percentage: 0.0,
                    subject_analysis: HashMap::new(),
                    chapter_analysis: HashMap::new(),
                    recommendations: vec![],
                    details: vec![],
                })
            }

            async fn generate_flashcards(
                &self,
                file_name: &str,
                bytes: Vec<u8>,
                _user_id: &Uuid,
            ) -> Result<Vec<Flashcard>> {
                *self.flashcards_input.lock().unwrap() = Some((file_name.to_string(), bytes));
                Ok(vec![Flashcard {
                    question: "Q".to_string(),
                    answer: "A".to_string(),
                    topic: "T".to_string(),
                }])
            }

            async fn generate_roadmap(
                &self,
                _prompt: &str,
                _user_id: &Uuid,
            ) -> Result<Vec<Milestone>> {
                Ok(vec![])
            }

            async fn send_chatbot_message(&self, text: &str, _user_id: &Uuid) -> Result<String> {
                Ok(format!("echo: {text}"))
            }
        }

        #[tokio::test]
        async fn generate_flashcards_feeds_the_stored_document_to_the_backend() {
            let backend = Arc::new(ScriptedAssistant::default());
            let (studyspace, _d, _l) =
                create_mock_studyspace_with_assistant(backend.clone()).await;
            let user = studyspace.create_user("Alice", None).await.unwrap();
            let document = studyspace
                .upload_document(&user.id, Some("CS"), "notes.pdf", b"heap notes")
                .await
                .unwrap();

            let cards = studyspace
                .generate_flashcards(&document.id, &user.id)
                .await
                .unwrap();

            assert_eq!(cards.len(), 1);
            let seen = backend.flashcards_input.lock().unwrap().take().unwrap();
            assert_eq!(seen.0, "notes.pdf");
            assert_eq!(seen.1, b"heap notes");
        }

        #[tokio::test]
        async fn generate_flashcards_unknown_document_is_not_found() {
            let backend = Arc::new(ScriptedAssistant::default());
            let (studyspace, _d, _l) = create_mock_studyspace_with_assistant(backend).await;
            let user = studyspace.create_user("Alice", None).await.unwrap();

            let result = studyspace.generate_flashcards(&Uuid::new_v4(), &user.id).await;

            assert!(matches!(result, Err(StudyspaceError::DocumentNotFound)));
        }

        #[tokio::test]
        async fn send_chatbot_message_trims_and_delegates() {
            let backend = Arc::new(ScriptedAssistant::default());
            let (studyspace, _d, _l) = create_mock_studyspace_with_assistant(backend).await;
            let user = studyspace.create_user("Alice", None).await.unwrap();

            let reply = studyspace
                .send_chatbot_message("  what is a heap?  ", &user.id)
                .await
                .unwrap();

            assert_eq!(reply, "echo: what is a heap?");
        }

        #[tokio::test]
        async fn send_chatbot_message_rejects_empty_text() {
            let backend = Arc::new(ScriptedAssistant::default());
            let (studyspace, _d, _l) = create_mock_studyspace_with_assistant(backend).await;
            let user = studyspace.create_user("Alice", None).await.unwrap();

            let result = studyspace.send_chatbot_message("   ", &user.id).await;

            assert!(matches!(result, Err(StudyspaceError::Validation(_))));
        }
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GeminiConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeSuggestion {
    pub theme: String,
    pub description: String,
    pub key_verse: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeSuggestions {
    pub themes: Vec<ThemeSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlinePoint {
    pub title: String,
    pub explanation: String,
    #[serde(default)]
    pub scripture_references: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SermonOutline {
    pub title: String,
    pub introduction: String,
    pub main_points: Vec<OutlinePoint>,
    pub conclusion: String,
}

/// Seam to the generative-text provider. Handlers only see this trait so
/// tests can swap in a canned implementation.
#[async_trait]
pub trait SermonGenerator: Send + Sync {
    async fn suggest_themes(&self, service_type: &str) -> anyhow::Result<ThemeSuggestions>;

    async fn generate_full(
        &self,
        service_type: &str,
        theme: &str,
        key_verse: &str,
    ) -> anyhow::Result<SermonOutline>;

    async fn generate_outline(&self, theme: &str, reference: Option<&str>)
        -> anyhow::Result<String>;
}

// --- Gemini REST types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

impl GenerationConfig {
    fn text() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: None,
        }
    }

    fn json() -> Self {
        Self {
            response_mime_type: Some("application/json"),
            ..Self::text()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GenerateContentResponse {
    fn into_text(self) -> anyhow::Result<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow::anyhow!("gemini response contained no candidates"))
    }
}

pub struct GeminiGenerator {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn generate(&self, prompt: String, config: GenerationConfig) -> anyhow::Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.config.model
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: config,
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            error!(%status, detail, "gemini request failed");
            anyhow::bail!("gemini returned {status}");
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let text = parsed.into_text()?;
        debug!(chars = text.len(), "gemini response received");
        Ok(text)
    }
}

#[async_trait]
impl SermonGenerator for GeminiGenerator {
    async fn suggest_themes(&self, service_type: &str) -> anyhow::Result<ThemeSuggestions> {
        let prompt = format!(
            "Você é um assistente teológico especialista em homilética.\n\
             O tipo de culto é: \"{service_type}\".\n\n\
             Gere 3 sugestões de temas para sermões baseados nesse tipo de culto.\n\n\
             Responda APENAS em formato JSON, seguindo este schema:\n\
             {{\"themes\": [{{\"theme\": \"Nome do Tema\", \
             \"description\": \"Uma breve descrição (1-2 frases) do tema.\", \
             \"key_verse\": \"João 3:16\"}}]}}"
        );
        let text = self.generate(prompt, GenerationConfig::json()).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn generate_full(
        &self,
        service_type: &str,
        theme: &str,
        key_verse: &str,
    ) -> anyhow::Result<SermonOutline> {
        let prompt = format!(
            "Você é um assistente teológico especialista em homilética.\n\
             Sua tarefa é criar um esboço detalhado para um sermão.\n\n\
             - Tipo de Culto: \"{service_type}\"\n\
             - Tema Principal: \"{theme}\"\n\
             - Versículo-Chave: \"{key_verse}\"\n\n\
             Gere um esboço completo, incluindo título, introdução, 3 pontos principais \
             (cada um com explicação e versículos de apoio), e uma conclusão.\n\n\
             Responda APENAS em formato JSON, seguindo este schema:\n\
             {{\"title\": \"...\", \"introduction\": \"...\", \
             \"mainPoints\": [{{\"title\": \"...\", \"explanation\": \"...\", \
             \"scriptureReferences\": [\"Mateus 5:14\"]}}], \"conclusion\": \"...\"}}"
        );
        let text = self.generate(prompt, GenerationConfig::json()).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn generate_outline(
        &self,
        theme: &str,
        reference: Option<&str>,
    ) -> anyhow::Result<String> {
        let reference_line = reference
            .map(|r| format!("- Referência bíblica: \"{r}\"\n"))
            .unwrap_or_default();
        let prompt = format!(
            "Você é um assistente teológico especialista em homilética.\n\
             Crie um esboço de sermão em texto corrido para:\n\
             - Tema: \"{theme}\"\n{reference_line}\
             Inclua título, introdução, três pontos principais e conclusão."
        );
        self.generate(prompt, GenerationConfig::text()).await
    }
}

/// Deterministic generator used by `AppState::fake()` and unit tests.
pub struct CannedGenerator;

#[async_trait]
impl SermonGenerator for CannedGenerator {
    async fn suggest_themes(&self, service_type: &str) -> anyhow::Result<ThemeSuggestions> {
        Ok(ThemeSuggestions {
            themes: (1..=3)
                .map(|i| ThemeSuggestion {
                    theme: format!("Tema {i} para {service_type}"),
                    description: "Descrição breve do tema.".into(),
                    key_verse: "João 3:16".into(),
                })
                .collect(),
        })
    }

    async fn generate_full(
        &self,
        _service_type: &str,
        theme: &str,
        key_verse: &str,
    ) -> anyhow::Result<SermonOutline> {
        Ok(SermonOutline {
            title: format!("Esboço sobre {theme}"),
            introduction: "Introdução gerada.".into(),
            main_points: (1..=3)
                .map(|i| OutlinePoint {
                    title: format!("Ponto {i}"),
                    explanation: "Explicação do ponto.".into(),
                    scripture_references: vec![key_verse.to_string()],
                })
                .collect(),
            conclusion: "Conclusão gerada.".into(),
        })
    }

    async fn generate_outline(
        &self,
        theme: &str,
        _reference: Option<&str>,
    ) -> anyhow::Result<String> {
        Ok(format!("Esboço: {theme}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gemini_response_envelope() {
        let raw = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "hello"}]}}
            ]
        }"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.into_text().unwrap(), "hello");
    }

    #[test]
    fn empty_candidates_is_an_error() {
        let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.into_text().is_err());
    }

    #[test]
    fn parses_structured_outline_payload() {
        let raw = r#"{
            "title": "A Luz do Mundo",
            "introduction": "Intro.",
            "mainPoints": [
                {
                    "title": "Ponto 1",
                    "explanation": "Explicação.",
                    "scriptureReferences": ["Mateus 5:14", "Salmos 119:105"]
                },
                {"title": "Ponto 2", "explanation": "Explicação."}
            ],
            "conclusion": "Conclusão."
        }"#;
        let outline: SermonOutline = serde_json::from_str(raw).unwrap();
        assert_eq!(outline.main_points.len(), 2);
        assert_eq!(outline.main_points[0].scripture_references.len(), 2);
        assert!(outline.main_points[1].scripture_references.is_empty());
    }

    #[test]
    fn json_config_requests_json_mime() {
        let body = serde_json::to_value(GenerationConfig::json()).unwrap();
        assert_eq!(body["responseMimeType"], "application/json");
        assert_eq!(body["maxOutputTokens"], 8192);
        let text = serde_json::to_value(GenerationConfig::text()).unwrap();
        assert!(text.get("responseMimeType").is_none());
    }

    #[tokio::test]
    async fn canned_generator_roundtrip() {
        let gen = CannedGenerator;
        let themes = gen.suggest_themes("Ensino").await.unwrap();
        assert_eq!(themes.themes.len(), 3);
        let outline = gen.generate_full("Ensino", "Fé", "Hebreus 11:1").await.unwrap();
        assert_eq!(outline.main_points.len(), 3);
        assert_eq!(outline.main_points[0].scripture_references[0], "Hebreus 11:1");
    }
}

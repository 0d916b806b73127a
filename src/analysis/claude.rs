use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::analysis::language::language_name;
use crate::analysis::text::count_words;
use crate::analysis::{AnalysisConfig, AnalysisError, Analyzer, RateLimiter};
use crate::domain::{
    AnalysisMethod, AnalysisResult, BehavioralTriggers, CulturalAdaptations, EmotionalAppeals,
    HabitFormation, MotivationFramework,
};

/// Claude Messages API client producing [`AnalysisResult`]s
pub struct ClaudeAnalyzer {
    client: Client,
    api_url: String,
    api_key: String,
    anthropic_version: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    limiter: Arc<RateLimiter>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// The JSON object the prompt asks for.
///
/// Every score, the sophistication score and the strategy label are required;
/// counts, examples, cultural notes and insights may be left out.
#[derive(Debug, Deserialize)]
struct ScoredReply {
    motivation_framework: MotivationFramework,
    behavioral_triggers: BehavioralTriggers,
    habit_formation: HabitFormation,
    emotional_appeals: EmotionalAppeals,
    #[serde(default)]
    cultural_adaptations: CulturalAdaptations,
    sophistication_score: f64,
    primary_strategy: String,
    #[serde(default)]
    key_insights: Vec<String>,
}

impl ClaudeAnalyzer {
    pub fn new(config: &AnalysisConfig, limiter: Arc<RateLimiter>) -> Result<Self, AnalysisError> {
        let api_key = config
            .resolved_api_key()
            .ok_or(AnalysisError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        info!("Claude analyzer initialized with model: {}", config.model);

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            anthropic_version: config.anthropic_version.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            limiter,
        })
    }

    async fn call(&self, prompt: &str) -> Result<String, AnalysisError> {
        self.limiter.acquire().await;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.anthropic_version)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Claude API returned {}: {}", status, body);
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(format!("unreadable API body: {e}")))?;

        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        Ok(text)
    }
}

/// Parse the JSON object embedded in a model reply.
///
/// The object is taken from the first `{` to the last `}` so that any prose
/// around it is ignored.
fn parse_reply(reply: &str) -> Result<ScoredReply, AnalysisError> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return Err(AnalysisError::InvalidResponse(
            "no JSON object in reply".to_string(),
        ));
    };
    if end < start {
        return Err(AnalysisError::InvalidResponse(
            "no JSON object in reply".to_string(),
        ));
    }

    serde_json::from_str(&reply[start..=end]).map_err(|e| {
        debug!("Raw reply: {}", reply.chars().take(500).collect::<String>());
        AnalysisError::InvalidResponse(e.to_string())
    })
}

fn cultural_context(language: &str) -> &'static str {
    match language {
        "de" => "Pay attention to German directness, engineering precision references, and Ordnung (order) concepts.",
        "fr" => "Look for French formality, intellectual appeals, and cultural sophistication references.",
        "es" => "Notice Spanish community emphasis, family values, and relationship-building language.",
        "pt" => "Look for Portuguese warmth, personal connection, and community-focused messaging.",
        "nl" => "Pay attention to Dutch pragmatism, consensus-building, and egalitarian values.",
        "sv" => "Notice Swedish minimalism, environmental consciousness, and collective welfare themes.",
        "da" => "Look for Danish hygge concepts, work-life balance, and trust-based society references.",
        "no" => "Pay attention to Norwegian nature connections, egalitarian values, and quality of life themes.",
        "fi" => "Notice Finnish practicality, education values, and reserved but trustworthy communication.",
        "pl" => "Look for Polish tradition respect, community solidarity, and historical awareness.",
        "cs" => "Pay attention to Czech skepticism, intellectual heritage, and European identity themes.",
        "sk" => "Notice Slovak community focus, cultural preservation, and regional identity elements.",
        "hu" => "Look for Hungarian uniqueness emphasis, cultural pride, and intellectual tradition.",
        "ro" => "Pay attention to Romanian family values, cultural richness, and European integration themes.",
        "lt" => "Notice Lithuanian independence values, cultural resilience, and Baltic identity.",
        "lv" => "Look for Latvian cultural preservation, nature connection, and independence themes.",
        _ => "Analyze using general European cultural contexts.",
    }
}

const RESPONSE_SCHEMA: &str = r#"{
    "motivation_framework": {
        "support_ratio": 0.0, "mission_density": 0.0, "feature_density": 0.0,
        "identity_score": 0.0, "community_score": 0.0,
        "counts": {"support": 0, "transactional": 0, "mission": 0, "feature": 0, "identity": 0, "community": 0},
        "examples": {"support": [], "transactional": [], "mission": [], "feature": [], "identity": [], "community": []}
    },
    "behavioral_triggers": {
        "scarcity_score": 0.0, "social_proof_score": 0.0, "loss_aversion_score": 0.0,
        "reciprocity_score": 0.0, "authority_score": 0.0,
        "counts": {"scarcity": 0, "social_proof": 0, "loss_aversion": 0, "reciprocity": 0, "authority": 0},
        "examples": {"scarcity": [], "social_proof": [], "loss_aversion": [], "reciprocity": [], "authority": []}
    },
    "habit_formation": {
        "temporal_score": 0.0, "frequency_score": 0.0, "convenience_score": 0.0, "platform_score": 0.0,
        "counts": {"temporal": 0, "frequency": 0, "convenience": 0, "platform": 0},
        "examples": {"temporal": [], "frequency": [], "convenience": [], "platform": []}
    },
    "emotional_appeals": {
        "fear_score": 0.0, "hope_score": 0.0, "belonging_score": 0.0, "status_score": 0.0,
        "examples": {"fear": [], "hope": [], "belonging": [], "status": []}
    },
    "cultural_adaptations": {
        "cultural_elements": [], "local_references": [],
        "communication_style": "direct/indirect/formal/informal", "trust_building": []
    },
    "sophistication_score": 0.0,
    "primary_strategy": "mission-driven/feature-driven/hybrid",
    "key_insights": ["3-5 key insights about the strategy"]
}"#;

fn build_prompt(text: &str, publisher: &str, language: &str) -> String {
    let name = language_name(language);
    format!(
        "You are an expert in behavioral economics and multilingual marketing analysis. \
         Analyze this subscription page text from {publisher}.\n\n\
         The text is in {name} ({language}). {context}\n\n\
         TEXT TO ANALYZE:\n{text}\n\n\
         Analyze the text for behavioral economics principles and return ONLY a valid JSON \
         object with this exact structure:\n\n{RESPONSE_SCHEMA}\n\n\
         SCORING GUIDELINES:\n\
         - All scores should be between 0.0 and 1.0\n\
         - support_ratio: Ratio of support language vs transactional language\n\
         - Density scores: Count of relevant terms / total words\n\
         - Sophistication score: Overall marketing sophistication (0-10 scale, but return as 0.0-1.0)\n\
         - Include actual quotes from the text in examples arrays\n\
         - Provide counts of relevant terms found\n\
         - Focus on culture-specific persuasion techniques for {name}\n\n\
         Return ONLY the JSON object, no additional text or explanation.",
        context = cultural_context(language),
    )
}

#[async_trait]
impl Analyzer for ClaudeAnalyzer {
    async fn analyze(
        &self,
        text: &str,
        publisher: &str,
        language: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyText);
        }

        info!("Starting Claude analysis for {} (language: {})", publisher, language);

        let reply = self.call(&build_prompt(text, publisher, language)).await?;
        let scored = parse_reply(&reply)?;

        // The prompt asks for sophistication on a 0-1 scale
        let sophistication_score = if (0.0..=1.0).contains(&scored.sophistication_score) {
            scored.sophistication_score * 10.0
        } else {
            scored.sophistication_score
        };

        let result = AnalysisResult {
            publisher_name: publisher.to_string(),
            detected_language: language.to_string(),
            language_name: language_name(language),
            total_words: count_words(text),
            motivation_framework: scored.motivation_framework,
            behavioral_triggers: scored.behavioral_triggers,
            habit_formation: scored.habit_formation,
            emotional_appeals: scored.emotional_appeals,
            cultural_adaptations: scored.cultural_adaptations,
            sophistication_score: (sophistication_score * 100.0).round() / 100.0,
            primary_strategy: scored.primary_strategy,
            key_insights: scored.key_insights,
            analysis_method: AnalysisMethod::ClaudeAi,
            model: Some(self.model.clone()),
            analysis_timestamp: Utc::now(),
        };

        result.validate().map_err(AnalysisError::InvalidResponse)?;

        info!("Completed Claude analysis for {}", publisher);
        Ok(result)
    }

    fn method(&self) -> AnalysisMethod {
        AnalysisMethod::ClaudeAi
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn scored_json(sophistication: f64, authority: f64) -> serde_json::Value {
        json!({
            "motivation_framework": {
                "support_ratio": 0.7, "mission_density": 0.04, "feature_density": 0.02,
                "identity_score": 0.01, "community_score": 0.03,
                "counts": {"support": 7, "transactional": 3},
                "examples": {"mission": ["independent journalism"]}
            },
            "behavioral_triggers": {
                "scarcity_score": 0.1, "social_proof_score": 0.2, "loss_aversion_score": 0.0,
                "reciprocity_score": 0.3, "authority_score": authority
            },
            "habit_formation": {
                "temporal_score": 0.1, "frequency_score": 0.0,
                "convenience_score": 0.2, "platform_score": 0.1
            },
            "emotional_appeals": {
                "fear_score": 0.0, "hope_score": 0.4, "belonging_score": 0.5, "status_score": 0.1
            },
            "cultural_adaptations": {"communication_style": "formal"},
            "sophistication_score": sophistication,
            "primary_strategy": "mission-driven",
            "key_insights": ["Appeals to civic duty"]
        })
    }

    fn api_reply(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn"
        })
    }

    fn config(server: &MockServer) -> AnalysisConfig {
        AnalysisConfig {
            api_key: Some("sk-ant-test".to_string()),
            api_url: format!("{}/v1/messages", server.uri()),
            rate_limit_per_minute: 0,
            ..Default::default()
        }
    }

    fn analyzer(server: &MockServer) -> ClaudeAnalyzer {
        ClaudeAnalyzer::new(&config(server), Arc::new(RateLimiter::per_minute(0))).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_parses_wrapped_json() {
        let server = MockServer::start().await;
        let reply = format!(
            "Here is the analysis:\n{}\nLet me know if you need more.",
            scored_json(0.72, 0.1)
        );

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header_exists("x-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({"temperature": 0.1, "max_tokens": 4000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_reply(&reply)))
            .expect(1)
            .mount(&server)
            .await;

        let result = analyzer(&server)
            .analyze("Support independent journalism today", "Daily", "de")
            .await
            .unwrap();

        assert_eq!(result.analysis_method, AnalysisMethod::ClaudeAi);
        assert_eq!(result.language_name, "German");
        assert_eq!(result.sophistication_score, 7.2);
        assert_eq!(result.primary_strategy, "mission-driven");
        assert_eq!(result.cultural_adaptations.communication_style, "formal");
        assert_eq!(result.motivation_framework.counts["support"], 7);
        assert_eq!(result.total_words, 4);
        assert_eq!(result.model.as_deref(), Some("claude-3-sonnet-20240229"));
    }

    #[tokio::test]
    async fn test_reply_without_json_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(api_reply("I cannot analyse this page.")),
            )
            .mount(&server)
            .await;

        let err = analyzer(&server)
            .analyze("Some text here", "Daily", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_category_is_invalid_response() {
        let server = MockServer::start().await;
        let mut scored = scored_json(0.5, 0.1);
        scored.as_object_mut().unwrap().remove("emotional_appeals");
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(api_reply(&scored.to_string())),
            )
            .mount(&server)
            .await;

        let err = analyzer(&server)
            .analyze("Some text here", "Daily", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(api_reply(&scored_json(0.5, 3.0).to_string())),
            )
            .mount(&server)
            .await;

        let err = analyzer(&server)
            .analyze("Some text here", "Daily", "en")
            .await
            .unwrap_err();
        match err {
            AnalysisError::InvalidResponse(msg) => assert!(msg.contains("authority_score")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let err = analyzer(&server)
            .analyze("Some text here", "Daily", "en")
            .await
            .unwrap_err();
        match err {
            AnalysisError::Api { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_text_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("  ", "Daily", "en").await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyText));
    }

    #[test]
    fn test_empty_categories_are_rejected() {
        let reply = r#"{"motivation_framework":{},"behavioral_triggers":{},"habit_formation":{},
            "emotional_appeals":{},"sophistication_score":5}"#;
        let err = parse_reply(reply).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
    }

    #[test]
    fn test_missing_strategy_is_rejected() {
        let mut scored = scored_json(0.5, 0.1);
        scored.as_object_mut().unwrap().remove("primary_strategy");
        match parse_reply(&scored.to_string()).unwrap_err() {
            AnalysisError::InvalidResponse(msg) => assert!(msg.contains("primary_strategy")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_score_field_is_rejected() {
        let mut scored = scored_json(0.5, 0.1);
        scored["habit_formation"]
            .as_object_mut()
            .unwrap()
            .remove("platform_score");
        match parse_reply(&scored.to_string()).unwrap_err() {
            AnalysisError::InvalidResponse(msg) => assert!(msg.contains("platform_score")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_optional_sections_may_be_omitted() {
        let mut scored = scored_json(0.5, 0.1);
        let obj = scored.as_object_mut().unwrap();
        obj.remove("cultural_adaptations");
        obj.remove("key_insights");
        let reply = parse_reply(&scored.to_string()).unwrap();
        assert_eq!(reply.cultural_adaptations.communication_style, "neutral");
        assert!(reply.key_insights.is_empty());
        assert!(reply.habit_formation.counts.is_empty());
    }

    #[test]
    fn test_sophistication_on_ten_point_scale_kept() {
        let scored = parse_reply(&scored_json(6.5, 0.1).to_string()).unwrap();
        assert_eq!(scored.sophistication_score, 6.5);
    }

    #[test]
    fn test_prompt_mentions_language_and_context() {
        let prompt = build_prompt("Předplatné", "Deník N", "cs");
        assert!(prompt.contains("Czech (cs)"));
        assert!(prompt.contains("Czech skepticism"));
        assert!(prompt.contains("Deník N"));
        assert!(prompt.contains("\"motivation_framework\""));
    }
}

use crate::models::ClaimKind;
use crate::numeric::{NumericValue, Unit};
use crate::pipeline::traits::{OracleCandidate, OracleJudgment, SemanticOracle};
use anyhow::{Context, Result};
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use serde::Deserialize;

pub struct LlmOracle {
    client: Client<OpenAIConfig>,
    model: String,
}

impl LlmOracle {
    pub fn new(api_key: &str, model: &str) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_API_BASE") {
            config = config.with_api_base(base_url);
        }
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    async fn complete(&self, system_prompt: &str, user_prompt: String) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .context("oracle response missing content")
    }

    fn truncate(text: &str, limit: usize) -> String {
        text.chars().take(limit).collect()
    }
}

#[derive(Deserialize)]
struct RawJudgment {
    supported: Option<bool>,
    confidence: Option<f32>,
    supporting_quote: Option<String>,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawCandidate {
    text: Option<String>,
    kind: Option<String>,
    #[serde(default)]
    numbers: Vec<RawNumber>,
    #[serde(default)]
    entities: Vec<String>,
    quote: Option<String>,
    location: Option<String>,
}

#[derive(Deserialize)]
struct RawNumber {
    value: Option<f64>,
    unit: Option<String>,
    #[serde(default)]
    context: String,
}

#[derive(Deserialize)]
struct RawComputed {
    computable: Option<bool>,
    value: Option<f64>,
}

fn parse_kind(raw: &str) -> ClaimKind {
    match raw.trim().to_lowercase().as_str() {
        "statistic" => ClaimKind::Statistic,
        "attribution" => ClaimKind::Attribution,
        "event" => ClaimKind::Event,
        "comparison" => ClaimKind::Comparison,
        _ => ClaimKind::Fact,
    }
}

fn parse_unit(raw: Option<&str>) -> Unit {
    match raw.map(|u| u.trim().to_lowercase()).as_deref() {
        Some("%") | Some("percent") => Unit::Percent,
        Some("pp") | Some("percentage_points") | Some("percentage points") => {
            Unit::PercentagePoint
        }
        Some("ratio") => Unit::Ratio,
        Some("rank") => Unit::Rank,
        Some("x") | Some("multiplier") => Unit::Multiplier,
        Some(sym @ ("$" | "€" | "£" | "¥")) => Unit::Currency {
            symbol: sym.to_string(),
        },
        Some(other) if !other.is_empty() => Unit::Count {
            noun: other.to_string(),
        },
        _ => Unit::None,
    }
}

#[async_trait]
impl SemanticOracle for LlmOracle {
    async fn judge(
        &self,
        statement: &str,
        claim_text: &str,
        excerpt: &str,
    ) -> Result<OracleJudgment> {
        let system_prompt = "You are a strict verification engine. Decide whether the CLAIM, \
with its verbatim EXCERPT, supports the STATEMENT. Output JSON only with keys: supported \
(bool), confidence (0..1), supporting_quote (string copied verbatim from the excerpt, or \
null), reason (string). Never invent quotes.";

        let user_prompt = format!(
            "STATEMENT:\n{}\n\nCLAIM:\n{}\n\nEXCERPT:\n{}",
            statement,
            claim_text,
            Self::truncate(excerpt, 1200),
        );

        let content = self.complete(system_prompt, user_prompt).await?;
        let raw: RawJudgment =
            serde_json::from_str(&content).context("oracle judgment is not valid JSON")?;

        // Missing required fields are unavailability, not a lenient default.
        let supported = raw.supported.context("oracle judgment missing `supported`")?;
        let confidence = raw
            .confidence
            .context("oracle judgment missing `confidence`")?
            .clamp(0.0, 1.0);
        let reason = raw.reason.context("oracle judgment missing `reason`")?;

        Ok(OracleJudgment {
            supported,
            confidence,
            supporting_quote: raw.supporting_quote.filter(|q| !q.trim().is_empty()),
            reason,
        })
    }

    async fn extract_candidates(&self, source_text: &str) -> Result<Vec<OracleCandidate>> {
        let system_prompt = "You extract atomic factual claims for a verification database. \
Output JSON only: an array of objects with keys text (string), kind (statistic|fact|\
attribution|event|comparison), numbers (array of {value, unit, context}), entities (array \
of strings), quote (a sentence copied verbatim from the source), location (string or null). \
Claims without a verbatim quote are useless; copy exactly.";

        let user_prompt = format!("SOURCE:\n{}", Self::truncate(source_text, 12_000));

        let content = self.complete(system_prompt, user_prompt).await?;
        // Non-conforming output rejects the whole response rather than being
        // partially trusted.
        let raw: Vec<RawCandidate> =
            serde_json::from_str(&content).context("oracle extraction is not a JSON array")?;

        let mut candidates = Vec::new();
        for item in raw {
            let (Some(text), Some(quote)) = (item.text, item.quote) else {
                continue;
            };
            let numbers = item
                .numbers
                .into_iter()
                .filter_map(|n| {
                    let value = n.value?;
                    Some(NumericValue {
                        value,
                        unit: parse_unit(n.unit.as_deref()),
                        context: n.context,
                    })
                })
                .collect();
            candidates.push(OracleCandidate {
                text,
                kind: parse_kind(item.kind.as_deref().unwrap_or("fact")),
                numbers,
                entities: item.entities,
                quote,
                location_hint: item.location,
            });
        }
        Ok(candidates)
    }

    async fn compute_value(
        &self,
        claimed: &NumericValue,
        statement: &str,
        source_text: &str,
    ) -> Result<Option<f64>> {
        let system_prompt = "You verify quantitative claims against raw source data. Compute \
what the SOURCE implies for the claimed quantity. Output JSON only with keys: computable \
(bool), value (number or null). Do not estimate beyond what the source's data supports.";

        let user_prompt = format!(
            "STATEMENT:\n{}\n\nCLAIMED VALUE: {} ({:?})\n\nSOURCE:\n{}",
            statement,
            claimed.value,
            claimed.unit,
            Self::truncate(source_text, 12_000),
        );

        let content = self.complete(system_prompt, user_prompt).await?;
        let raw: RawComputed =
            serde_json::from_str(&content).context("oracle computation is not valid JSON")?;

        match raw.computable {
            Some(true) => Ok(raw.value),
            _ => Ok(None),
        }
    }
}

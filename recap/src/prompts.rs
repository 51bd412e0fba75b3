//! Prompt configuration per output language

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Placeholder replaced by the input text in user prompt templates
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// Output language, also the language variant of cache keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Synthetic system message text carrying a rolling summary
    pub fn summary_wrapper(&self, summary: &str) -> String {
        match self {
            Language::En => format!("Summary of the earlier conversation:\n{}", summary),
            Language::Zh => format!("此前对话的摘要：\n{}", summary),
        }
    }

    /// Instruction asking for a summary of an accumulated transcript
    pub fn rolling_summary_prompt(&self, transcript: &str) -> String {
        match self {
            Language::En => format!(
                "Summarize the following conversation concisely. Keep facts, decisions and open questions.\n\n{}",
                transcript
            ),
            Language::Zh => format!("请简要总结以下对话，保留事实、决定和未解决的问题。\n\n{}", transcript),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Accepts bare codes and regional tags ("en-US", "zh_CN")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

/// Complete prompt settings for one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    pub system_prompt: String,
    /// Must contain `{content}`
    pub user_prompt_template: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl PromptConfig {
    pub fn defaults_for(language: Language) -> Self {
        match language {
            Language::En => Self {
                system_prompt: "You are a precise assistant that writes faithful, well-structured summaries.".to_string(),
                user_prompt_template: "Summarize the following content in a few short paragraphs. Keep the key facts and conclusions.\n\n{content}".to_string(),
                temperature: 0.3,
                max_tokens: 1024,
            },
            Language::Zh => Self {
                system_prompt: "你是一个严谨的助手，负责撰写准确、条理清晰的摘要。".to_string(),
                user_prompt_template: "请用几段简短的文字总结以下内容，保留关键事实和结论。\n\n{content}".to_string(),
                temperature: 0.3,
                max_tokens: 1024,
            },
        }
    }

    pub fn render_user_prompt(&self, content: &str) -> String {
        if self.user_prompt_template.contains(CONTENT_PLACEHOLDER) {
            self.user_prompt_template.replace(CONTENT_PLACEHOLDER, content)
        } else {
            format!("{}\n\n{}", self.user_prompt_template, content)
        }
    }

    pub fn merged(mut self, overrides: &PromptOverrides) -> Self {
        if let Some(system_prompt) = &overrides.system_prompt {
            self.system_prompt = system_prompt.clone();
        }
        if let Some(template) = &overrides.user_prompt_template {
            self.user_prompt_template = template.clone();
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.max_tokens = max_tokens;
        }
        self
    }
}

/// Partial prompt settings from configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptOverrides {
    pub system_prompt: Option<String>,
    pub user_prompt_template: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Resolved prompt configuration for every language
#[derive(Debug, Clone)]
pub struct PromptSet {
    prompts: HashMap<Language, PromptConfig>,
}

impl PromptSet {
    pub fn new(overrides: &HashMap<Language, PromptOverrides>) -> Self {
        let prompts = [Language::En, Language::Zh]
            .into_iter()
            .map(|language| {
                let config = PromptConfig::defaults_for(language);
                let config = match overrides.get(&language) {
                    Some(o) => config.merged(o),
                    None => config,
                };
                (language, config)
            })
            .collect();
        Self { prompts }
    }

    pub fn get(&self, language: Language) -> PromptConfig {
        self.prompts
            .get(&language)
            .cloned()
            .unwrap_or_else(|| PromptConfig::defaults_for(language))
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("en".parse::<Language>(), Ok(Language::En));
        assert_eq!("en-US".parse::<Language>(), Ok(Language::En));
        assert_eq!("zh_CN".parse::<Language>(), Ok(Language::Zh));
        assert_eq!("ZH".parse::<Language>(), Ok(Language::Zh));
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_serde_codes() {
        assert_eq!(serde_json::to_string(&Language::Zh).unwrap(), "\"zh\"");
        let parsed: Language = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(parsed, Language::En);
    }

    #[test]
    fn test_render_user_prompt() {
        let config = PromptConfig::defaults_for(Language::En);
        let rendered = config.render_user_prompt("BODY");
        assert!(rendered.ends_with("BODY"));
        assert!(!rendered.contains(CONTENT_PLACEHOLDER));
    }

    #[test]
    fn test_template_without_placeholder_appends_content() {
        let config = PromptConfig::defaults_for(Language::En).merged(&PromptOverrides {
            user_prompt_template: Some("Summarize:".to_string()),
            ..Default::default()
        });
        assert_eq!(config.render_user_prompt("text"), "Summarize:\n\ntext");
    }

    #[test]
    fn test_overrides_merge_field_by_field() {
        let mut overrides = HashMap::new();
        overrides.insert(
            Language::Zh,
            PromptOverrides {
                temperature: Some(0.9),
                ..Default::default()
            },
        );

        let set = PromptSet::new(&overrides);
        let zh = set.get(Language::Zh);
        assert_eq!(zh.temperature, 0.9);
        assert_eq!(zh.max_tokens, PromptConfig::defaults_for(Language::Zh).max_tokens);
        assert_eq!(set.get(Language::En), PromptConfig::defaults_for(Language::En));
    }

    #[test]
    fn test_summary_wrapper_is_language_specific() {
        assert!(Language::En.summary_wrapper("S").starts_with("Summary"));
        assert!(Language::Zh.summary_wrapper("S").contains("摘要"));
    }
}

use crate::config::LlmConfig;
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use shared::models::{Character, RapStyle};
use thiserror::Error;

/// Criteria every verse is scored against, in prompt order.
pub const SCORING_RUBRIC: [&str; 4] = [
    "rhyme scheme complexity",
    "wordplay creativity",
    "flow and rhythm",
    "battle relevance",
];

/// Score used when the scorer's reply cannot be read or the call fails.
pub const DEFAULT_SCORE: u8 = 5;
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

const VERSE_LINES: usize = 16;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("OpenAI error: {0}")]
    OpenAi(#[from] OpenAIError),
    #[error("Completion returned no text")]
    EmptyCompletion,
}

/// Everything the generator needs to write one verse for a character.
#[derive(Clone, Debug)]
pub struct VersePrompt<'a> {
    pub name: &'a str,
    pub style: &'a RapStyle,
    pub personality: &'a str,
    pub signature: &'a [String],
    pub topic: &'a str,
    pub opponent: Option<&'a str>,
    pub previous_verse: Option<&'a str>,
    pub battle_context: Option<String>,
}

impl<'a> VersePrompt<'a> {
    pub fn for_character(character: &'a Character, topic: &'a str) -> Self {
        Self {
            name: &character.name,
            style: &character.style,
            personality: if character.personality.trim().is_empty() {
                &character.description
            } else {
                &character.personality
            },
            signature: &character.signature,
            topic,
            opponent: None,
            previous_verse: None,
            battle_context: None,
        }
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = String::from(
            "You are an AI rap battle generator specializing in creating authentic, creative verses.\n\n",
        );
        prompt.push_str("Character Profile:\n");
        prompt.push_str(&format!("- Name: {}\n", self.name));
        prompt.push_str(&format!(
            "- Style: {} with {} rhyme schemes\n",
            self.style.attitude, self.style.complexity
        ));
        prompt.push_str(&format!("- Tempo: {}\n", self.style.tempo));
        prompt.push_str(&format!("- Personality: {}\n", self.personality));
        prompt.push_str(&format!(
            "- Signature phrases: {}\n\n",
            self.signature.join(", ")
        ));

        prompt.push_str("Guidelines:\n");
        prompt.push_str(&format!("- Generate exactly {} bars (lines)\n", VERSE_LINES));
        prompt.push_str(&format!(
            "- Use {} rhyme scheme\n",
            self.style.rhyme_scheme
        ));
        prompt.push_str("- Stay in character with appropriate vocabulary and flow\n");
        prompt.push_str("- Be creative with wordplay and metaphors\n");
        prompt.push_str("- Keep content competitive but appropriate\n");
        prompt.push_str(&format!("- Reference the topic: {}\n", self.topic));
        if let Some(opponent) = self.opponent {
            prompt.push_str(&format!("- Reference opponent: {}\n", opponent));
        }
        if let Some(previous) = self.previous_verse {
            prompt.push_str("- Respond to previous verse themes\n");
            prompt.push_str(&format!("\nPrevious verse:\n{}\n", previous));
        }
        if let Some(context) = &self.battle_context {
            prompt.push_str(&format!("- Battle context: {}\n", context));
        }
        prompt.push_str(&format!(
            "\nOutput format: Return only the rap verse, one line per bar, numbered 1-{}.",
            VERSE_LINES
        ));
        prompt
    }

    pub fn user_prompt(&self) -> String {
        format!(
            "Generate a {} rap verse about {}",
            self.style.attitude, self.topic
        )
    }
}

pub fn scoring_prompt(verse: &str, criteria: &[&str]) -> String {
    format!(
        "Rate this rap verse on a scale of 1-10 based on: {}.\n\nVerse:\n{}\n\nReturn only a number between 1-10.",
        criteria.join(", "),
        verse
    )
}

/// Reads the scorer's reply the way a lenient integer parse would: leading
/// whitespace, an optional sign, then digits. Anything else is `DEFAULT_SCORE`.
/// The result is clamped to `MIN_SCORE..=MAX_SCORE`.
pub fn parse_score(reply: &str) -> u8 {
    let trimmed = reply.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return DEFAULT_SCORE;
    }
    // Overlong numbers saturate, which clamps the same way
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    let value = if negative { -magnitude } else { magnitude };
    clamp_score(value)
}

pub fn clamp_score(value: i64) -> u8 {
    value.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8
}

#[async_trait]
pub trait VerseGenerator: Send + Sync {
    async fn generate_verse(&self, prompt: &VersePrompt<'_>) -> Result<String, LlmError>;
}

/// Returns the scorer's raw reply; [`parse_score`] turns it into a score.
#[async_trait]
pub trait VerseScorer: Send + Sync {
    async fn rate_verse(&self, verse: &str, criteria: &[&str]) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat-completions client (Groq by default).
pub struct ChatCompletionsClient {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: LlmConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone());

        Self {
            client: Client::with_config(openai_config),
            config,
        }
    }

    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.config.model.clone())
            .messages(messages)
            .temperature(temperature)
            .max_tokens(max_tokens)
            .build()?;

        let response = self.client.chat().create(request).await?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl VerseGenerator for ChatCompletionsClient {
    async fn generate_verse(&self, prompt: &VersePrompt<'_>) -> Result<String, LlmError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system_prompt())
            .build()?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user_prompt())
            .build()?;

        let verse = self
            .complete(
                vec![
                    ChatCompletionRequestMessage::System(system),
                    ChatCompletionRequestMessage::User(user),
                ],
                self.config.verse_temperature,
                self.config.verse_max_tokens,
            )
            .await?;

        if verse.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(verse)
    }
}

#[async_trait]
impl VerseScorer for ChatCompletionsClient {
    async fn rate_verse(&self, verse: &str, criteria: &[&str]) -> Result<String, LlmError> {
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(scoring_prompt(verse, criteria))
            .build()?;

        self.complete(
            vec![ChatCompletionRequestMessage::User(user)],
            self.config.score_temperature,
            self.config.score_max_tokens,
        )
        .await
    }
}

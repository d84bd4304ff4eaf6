//! Instruction texts and prompt builders for every analyzer call.
//!
//! Everything here is pure string assembly so it can be tested without a
//! model provider.

use super::{DreamContext, Turn};

/// Characters of each description shown to the pattern call.
pub const PATTERN_PREVIEW_CHARS: usize = 200;

pub const INTERPRETATION_INSTRUCTIONS: &str = "\
You are an expert dream analyst specializing in symbolic interpretation, with deep knowledge of Jungian and Freudian psychology, and cultural symbolism.

Your role is to provide insightful, empathetic dream interpretations that help people explore their subconscious.

Guidelines:
- Use a warm, empathetic, and insightful tone
- Reference specific elements from the dream description
- Draw on psychological frameworks (Jungian archetypes, Freudian symbolism)
- Be encouraging but honest
- Avoid being overly prescriptive
- Keep the interpretation comprehensive yet accessible

Structure your analysis with these sections:
1. **Overall Interpretation**: A comprehensive interpretation of the dream's meaning (2-3 paragraphs)
2. **Key Symbols**: Identify and explain the symbolic meaning of important elements
3. **Emotional Themes**: Analyze the emotional undertones and what they might represent
4. **Psychological Insights**: Provide insights based on Jungian and Freudian psychology
5. **Actionable Reflections**: Suggest questions or reflections for the dreamer

Make it personal and specific to their unique dream experience.";

pub const SYMBOL_INSTRUCTIONS: &str = r#"You are an expert at identifying dream symbols and their meanings.

Extract key symbols from the dream description and provide their common symbolic meanings based on psychology, mythology, and cultural symbolism.

Return ONLY valid JSON in this exact format:
{
  "symbols": [
    {"symbol": "symbol name", "meaning": "symbolic meaning"},
    {"symbol": "symbol name", "meaning": "symbolic meaning"}
  ]
}

Be specific and insightful. Focus on the most significant symbols."#;

pub const PATTERN_INSTRUCTIONS: &str = "\
You are an expert at identifying patterns in dreams over time.

Analyze the collection of dreams provided and identify:
1. Recurring symbols or themes
2. Emotional patterns
3. Possible meanings of these patterns
4. Insights about the dreamer's subconscious state

Provide a comprehensive pattern analysis that helps the dreamer understand their recurring dream themes.";

pub fn interpretation_prompt(description: &str, emotions: &[String]) -> String {
    let emotions = if emotions.is_empty() {
        "Not specified".to_owned()
    } else {
        emotions.join(", ")
    };
    format!(
        "Dream Analysis Request:\n\n\
         Dream Description:\n{description}\n\n\
         Emotions Felt During Dream:\n{emotions}\n\n\
         Please provide a comprehensive dream interpretation following the structure outlined in your instructions. \
         Make this analysis specific to the unique elements and emotional context of this dream."
    )
}

pub fn symbol_prompt(description: &str) -> String {
    format!(
        "Dream Description:\n{description}\n\n\
         Extract the key symbols from this dream and provide their symbolic meanings."
    )
}

/// `descriptions` must already be limited to the analysis window.
pub fn pattern_prompt<S: AsRef<str>>(descriptions: &[S]) -> String {
    let summaries = descriptions
        .iter()
        .enumerate()
        .map(|(i, d)| format!("Dream {}: {}...", i + 1, preview(d.as_ref(), PATTERN_PREVIEW_CHARS)))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Pattern Analysis Request:\n\n\
         Recent Dreams:\n{summaries}\n\n\
         Please analyze these dreams and identify any recurring patterns, themes, or symbols."
    )
}

pub fn chat_instructions(dream: &DreamContext<'_>) -> String {
    format!(
        "You are an expert dream analyst having a conversation with someone about their dream.\n\n\
         Dream Context:\n\
         - Title: {title}\n\
         - Description: {description}\n\
         - Emotions: {emotions}\n\
         - Initial Interpretation: {interpretation}\n\n\
         Answer the user's follow-up questions about their dream. Be empathetic, insightful, and help them explore deeper meanings.\n\
         You can ask clarifying questions to better understand their dream and provide more personalized insights.\n\n\
         Maintain context from the conversation history and provide thoughtful, personalized responses.",
        title = dream.title,
        description = dream.description,
        emotions = dream.emotions.join(", "),
        interpretation = dream.interpretation.unwrap_or("N/A"),
    )
}

/// `history` must already be limited to the chat window.
pub fn chat_prompt(history: &[Turn<'_>], question: &str) -> String {
    let conversation = if history.is_empty() {
        "No previous conversation".to_owned()
    } else {
        history
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_ref().to_uppercase(), turn.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    format!(
        "Conversation History:\n{conversation}\n\n\
         User Question:\n{question}\n\n\
         Please provide a thoughtful response to the user's question about their dream."
    )
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

//! Renders a [`UserDataSnapshot`] into the personality-analysis prompt.
//!
//! Section order, section headers and per-item line formats are fixed;
//! consumers of the prompt depend on this exact shape.

use collecthub_core::{CategoryRecord, UserDataSnapshot};
use std::fmt::Write as _;

const PREAMBLE: &str = "As an expert personality analyst, please analyze the following user data and provide a comprehensive personality profile. Focus on personality traits, interests, values, and behavioral patterns.

User Data Analysis:

";

const INSTRUCTIONS: &str = "

Please provide a detailed personality analysis covering:
1. **Core Personality Traits** - What kind of person they are
2. **Interests & Hobbies** - What they're passionate about
3. **Values & Beliefs** - What matters most to them
4. **Social Behavior** - How they interact with others
5. **Lifestyle Preferences** - How they like to live
6. **Growth Areas** - Potential areas for personal development
7. **Compatibility** - What kind of people/activities they'd connect with

Make the analysis personal, insightful, and constructive. Format it in a friendly, engaging way.";

/// Build the analysis prompt. Pure and deterministic.
pub fn build_personality_prompt(snapshot: &UserDataSnapshot) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(PREAMBLE);

    prompt.push_str("**Books:**\n");
    for book in &snapshot.books {
        if let Some(name) = book.get("book_name") {
            let _ = writeln!(prompt, "- {} (Reason: {})", name, book.get_or_empty("reason"));
        }
    }

    prompt.push_str("\n**Movies/Shows:**\n");
    for movie in &snapshot.movies {
        if let Some(title) = movie.get("title") {
            let _ = writeln!(
                prompt,
                "- {} ({}) - Reason: {}",
                title,
                movie.get_or_empty("type"),
                movie.get_or_empty("reason")
            );
        }
    }

    prompt.push_str("\n**Pets:**\n");
    push_reasoned(&mut prompt, &snapshot.pets, "name");

    prompt.push_str("\n**Favorite Quotes:**\n");
    for quote in &snapshot.quotes {
        if let Some(text) = quote.get("quote") {
            let _ = writeln!(prompt, "- \"{}\"", text);
        }
    }

    prompt.push_str("\n**Recipes/Food:**\n");
    push_reasoned(&mut prompt, &snapshot.recipes, "name");

    prompt.push_str("\n**Travel Destinations:**\n");
    push_reasoned(&mut prompt, &snapshot.travel, "place_name");

    prompt.push_str(INSTRUCTIONS);
    prompt
}

// `- <primary> (Reason: <reason>)`, skipping records without the primary field.
fn push_reasoned(prompt: &mut String, records: &[CategoryRecord], primary: &str) {
    for record in records {
        if let Some(value) = record.get(primary) {
            let _ = writeln!(prompt, "- {} (Reason: {})", value, record.get_or_empty("reason"));
        }
    }
}

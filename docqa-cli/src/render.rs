//! Plain-text rendering of answers.

use std::fmt::{Display, Write};

use chrono::{DateTime, TimeZone};
use docqa_rag::Answer;

/// Render an answer, optionally followed by the numbered chunks it was built
/// from, and the time it was produced.
pub fn render_answer<Tz>(answer: &Answer, show_context: bool, answered_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = format!("Answer: {}\n", answer.answer.trim());

    if show_context {
        out.push_str("\nRetrieved context:\n");
        for (i, scored) in answer.used_chunks.iter().enumerate() {
            let _ = writeln!(out, "Chunk {} (score {:.3}): {}", i + 1, scored.score, scored.chunk.content);
        }
    }

    let _ = write!(out, "\nAnswered at {}", answered_at.format("%Y-%m-%d %H:%M:%S"));
    out
}

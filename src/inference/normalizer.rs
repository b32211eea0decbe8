//! Content normalization for raw model output.
//!
//! Local models interleave reasoning (`<think>…</think>`), wrapper tags, and
//! occasionally run past the end of their turn into the next role marker.
//! [`clean_content`] turns a complete response into user-facing text;
//! [`ThinkFilter`] does the reasoning suppression incrementally for deltas
//! that are forwarded while the stream is still running.

use std::sync::OnceLock;

use regex::Regex;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Trailing artifacts left when the model keeps generating past its turn.
/// Checked in order; at most one is removed per call.
const ANTI_PROMPT_MARKERS: [&str; 3] = ["User:", "Human:", "###"];

fn think_span_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think regex"))
}

/// Strip reasoning spans, `<response>` wrapper tags and one trailing
/// anti-prompt marker from a complete model response.
///
/// Returns an empty string for empty or whitespace-only input.
pub fn clean_content(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let without_think = think_span_pattern().replace_all(raw, "");
    let unwrapped = without_think
        .replace("<response>", "")
        .replace("</response>", "");

    let mut text = unwrapped.trim_end().to_string();

    for marker in ANTI_PROMPT_MARKERS {
        if let Some(stripped) = text.strip_suffix(marker) {
            text = stripped.trim_end().to_string();
            break;
        }
    }

    text
}

// ─── Streaming Filter ────────────────────────────────────────────────────────

/// Incremental `<think>` suppression for streamed deltas.
///
/// Tags may be split across chunk boundaries, so a trailing fragment that
/// could still become a tag is held back until the next delta decides it.
#[derive(Debug, Default)]
pub struct ThinkFilter {
    in_think: bool,
    carry: String,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one delta and return the visible portion that is safe to emit.
    pub fn push(&mut self, delta: &str) -> String {
        self.carry.push_str(delta);
        let mut visible = String::new();

        loop {
            let tag = if self.in_think { THINK_CLOSE } else { THINK_OPEN };

            if let Some(idx) = self.carry.find(tag) {
                if !self.in_think {
                    visible.push_str(&self.carry[..idx]);
                }
                self.carry.drain(..idx + tag.len());
                self.in_think = !self.in_think;
                continue;
            }

            let keep = partial_tag_suffix_len(&self.carry, tag);
            let emit_len = self.carry.len() - keep;
            if !self.in_think {
                visible.push_str(&self.carry[..emit_len]);
            }
            self.carry.drain(..emit_len);
            break;
        }

        visible
    }

    /// Flush whatever is held back once the stream has ended.
    ///
    /// A dangling fragment inside an unterminated think block is dropped.
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.carry);
        if std::mem::take(&mut self.in_think) {
            String::new()
        } else {
            tail
        }
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`.
fn partial_tag_suffix_len(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&len| {
            text.len() >= len
                && text.is_char_boundary(text.len() - len)
                && tag.starts_with(&text[text.len() - len..])
        })
        .unwrap_or(0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

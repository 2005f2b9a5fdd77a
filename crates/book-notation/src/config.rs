//! Parser configuration with defaults and environment overrides.

use std::env;
use std::str::FromStr;

use regex::Regex;
use tracing::info;

use crate::error::NotationError;

/// Default prose cues that announce a variation.
pub const DEFAULT_CUE_PHRASES: &[&str] = &[
    "instead",
    "after",
    "would",
    "should",
    "alternatively",
    "rather than",
];

/// Criterion used when lookahead scores tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// Prefer a candidate parent on the main line.
    MainLine,
    /// Prefer the most recently created candidate parent.
    MostRecent,
}

impl FromStr for TieBreak {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main-line" | "mainline" | "main_line" => Ok(TieBreak::MainLine),
            "most-recent" | "recent" | "most_recent" => Ok(TieBreak::MostRecent),
            other => Err(NotationError::Config(format!("unknown tie-break '{other}'"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParserConfig {
    /// Phrases that, in recent prose, announce a variation.
    pub cue_phrases: Vec<String>,

    /// Number of most recent text tokens scanned for a cue. A cue keeps
    /// counting, however many moves follow it, until this many newer text
    /// tokens have arrived. Capped by `cue_history`.
    pub cue_window: usize,

    /// Number of recent text tokens remembered for cue detection.
    pub cue_history: usize,

    /// Upcoming move tokens simulated per candidate during lookahead.
    pub lookahead_window: usize,

    /// Applied in order when lookahead scores tie.
    pub tie_break: Vec<TieBreak>,

    /// Starting position; standard start when unset.
    pub start_fen: Option<String>,

    /// Chapters with less content than this are dropped.
    pub min_chapter_length: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            cue_phrases: DEFAULT_CUE_PHRASES.iter().map(|s| s.to_string()).collect(),
            cue_window: 1,
            cue_history: 2,
            lookahead_window: 4,
            tie_break: vec![TieBreak::MainLine, TieBreak::MostRecent],
            start_fen: None,
            min_chapter_length: 20,
        }
    }
}

impl ParserConfig {
    /// Defaults overridden by `BOOK_*` environment variables.
    pub fn from_env() -> Result<Self, NotationError> {
        let mut config = Self::default();

        if let Ok(phrases) = env::var("BOOK_CUE_PHRASES") {
            config.cue_phrases = phrases
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }

        config.cue_window = env_usize("BOOK_CUE_WINDOW", config.cue_window)?;
        config.cue_history = env_usize("BOOK_CUE_HISTORY", config.cue_history)?;
        config.lookahead_window = env_usize("BOOK_LOOKAHEAD_WINDOW", config.lookahead_window)?;
        config.min_chapter_length =
            env_usize("BOOK_MIN_CHAPTER_LENGTH", config.min_chapter_length)?;

        if let Ok(order) = env::var("BOOK_TIE_BREAK") {
            config.tie_break = order
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(TieBreak::from_str)
                .collect::<Result<_, _>>()?;
        }

        config.start_fen = env::var("BOOK_START_FEN").ok().filter(|f| !f.trim().is_empty());

        info!(
            cue_phrases = config.cue_phrases.len(),
            lookahead_window = config.lookahead_window,
            tie_break = ?config.tie_break,
            custom_start = config.start_fen.is_some(),
            "Parser config loaded"
        );

        Ok(config)
    }

    /// Case-insensitive whole-word matcher for the cue phrases, or `None`
    /// when no phrases are configured.
    pub fn cue_matcher(&self) -> Result<Option<Regex>, NotationError> {
        if self.cue_phrases.is_empty() {
            return Ok(None);
        }
        let alternatives: Vec<String> = self
            .cue_phrases
            .iter()
            .map(|p| regex::escape(p).replace(' ', r"\s+"))
            .collect();
        let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
        Regex::new(&pattern)
            .map(Some)
            .map_err(|e| NotationError::Config(format!("invalid cue phrase: {e}")))
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize, NotationError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| NotationError::Config(format!("{name} must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}

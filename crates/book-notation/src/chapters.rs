//! Book sectioning: chapters, games inside chapters, and game headers.
//!
//! Book text is split into chapters on common heading styles, each chapter
//! into games on `Game N` markers, and each game is parsed into its own tree
//! and PGN.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use shakmaty::Chess;
use tracing::{debug, info};

use crate::builder::ParsedGame;
use crate::config::ParserConfig;
use crate::error::NotationError;
use crate::oracle::{PositionOracle, ShakmatyOracle};
use crate::pgn::{write_pgn, PgnHeaders};
use crate::token::Token;
use crate::tokenizer::tokenize;
use crate::tree::{GameTree, NodeId};
use crate::{oracle_for, parse_with};

/// Text before the first heading becomes a chapter when longer than this.
const MIN_INTRODUCTION_LENGTH: usize = 100;

/// Text before the first game marker becomes its own entry when longer than this.
const MIN_PREAMBLE_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSegment {
    pub title: String,
    pub text: String,
    /// Commentary before the first game; kept as a comment, not parsed.
    pub is_preamble: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameHeader {
    pub white: String,
    pub black: String,
    /// PGN date, year only (`1959.??.??`).
    pub date: String,
    /// Byte offset where the header ends in the segment text.
    pub end: usize,
}

/// One converted game.
#[derive(Debug, Clone)]
pub struct BookGame {
    pub title: String,
    pub headers: PgnHeaders,
    pub game: ParsedGame<Chess>,
    pub pgn: String,
}

fn chapter_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let patterns = [
            r"Chapter[ \t]+(?:\d+|One|Two|Three|Four|Five|Six|Seven|Eight|Nine|Ten|Eleven|Twelve|Thirteen|Fourteen|Fifteen)[^\n]*",
            r"CHAPTER[ \t]+(?:\d+|ONE|TWO|THREE|FOUR|FIVE|SIX|SEVEN|EIGHT|NINE|TEN|ELEVEN|TWELVE|THIRTEEN|FOURTEEN|FIFTEEN)[^\n]*",
            r"Part[ \t]+(?:[IVX\d]+|One|Two|Three|Four|Five|Six|Seven|Eight|Nine|Ten)[^\n]*",
            r"\d+\.[ \t]+[A-Z][^\n]{5,100}",
            r"#{1,3}[ \t]+[^\n]+",
        ];
        let pattern = format!(r"(?m)^(?:{})", patterns.join("|"));
        Regex::new(&pattern).expect("chapter heading pattern is valid")
    })
}

fn game_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bGame[ \t]+\d+\b").expect("game marker pattern is valid"))
}

fn game_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^Game\s+\d+\s+(?P<white>[^-\n]+)-(?P<black>[^\s]+)\s+(?P<location>.*?)(?P<year>\d{4})",
        )
        .expect("game header pattern is valid")
    })
}

/// A numbered heading like "1. Nf3 d5 ..." is notation, not a title.
fn is_notation_line(line: &str) -> bool {
    matches!(tokenize(line).first(), Some(Token::Move(mv)) if mv.span.start == 0)
}

/// Split book text into chapters on common heading styles.
pub fn extract_chapters(text: &str, min_content_length: usize) -> Vec<Chapter> {
    let headings: Vec<_> = chapter_heading_re()
        .find_iter(text)
        .filter(|m| !is_notation_line(m.as_str()))
        .collect();

    let Some(first) = headings.first() else {
        return vec![Chapter {
            title: "Full Book".to_string(),
            content: text.trim().to_string(),
        }];
    };

    let mut chapters = Vec::new();
    let intro = text[..first.start()].trim();
    if intro.len() > MIN_INTRODUCTION_LENGTH {
        chapters.push(Chapter {
            title: "Introduction".to_string(),
            content: intro.to_string(),
        });
    }

    for (i, heading) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map_or(text.len(), |next| next.start());
        let content = text[heading.end()..end].trim();
        if content.len() < min_content_length {
            debug!(title = heading.as_str().trim(), "Dropping short chapter");
            continue;
        }
        chapters.push(Chapter {
            title: heading.as_str().trim().to_string(),
            content: content.to_string(),
        });
    }

    chapters
}

/// Split a chapter into games on `Game N` markers.
pub fn split_games(chapter: &Chapter) -> Vec<GameSegment> {
    let text = chapter.content.as_str();
    let markers: Vec<_> = game_marker_re().find_iter(text).collect();

    let Some(first) = markers.first() else {
        return vec![GameSegment {
            title: chapter.title.clone(),
            text: text.to_string(),
            is_preamble: false,
        }];
    };

    let mut segments = Vec::new();
    let preamble = text[..first.start()].trim();
    if preamble.len() > MIN_PREAMBLE_LENGTH {
        segments.push(GameSegment {
            title: format!("{} - Introduction", chapter.title),
            text: preamble.to_string(),
            is_preamble: true,
        });
    }

    for (i, marker) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
        segments.push(GameSegment {
            title: format!("{} - {}", chapter.title, marker.as_str().trim()),
            text: text[marker.start()..end].trim().to_string(),
            is_preamble: false,
        });
    }

    segments
}

/// Read a `Game N White-Black Location Year` line at the start of a segment.
pub fn parse_game_header(text: &str) -> Option<GameHeader> {
    let caps = game_header_re().captures(text)?;
    Some(GameHeader {
        white: caps.name("white")?.as_str().trim().to_string(),
        black: caps.name("black")?.as_str().trim().to_string(),
        date: format!("{}.??.??", caps.name("year")?.as_str()),
        end: caps.get(0)?.end(),
    })
}

/// Parse one segment and render it as PGN.
pub fn convert_segment<O>(
    segment: &GameSegment,
    config: &ParserConfig,
    oracle: &O,
) -> Result<BookGame, NotationError>
where
    O: PositionOracle<Position = Chess>,
{
    let mut headers = PgnHeaders {
        event: segment.title.clone(),
        fen: config.start_fen.clone(),
        ..PgnHeaders::default()
    };

    let game = if segment.is_preamble {
        headers.black = "Introduction".to_string();
        let start = oracle.initial_position();
        let mut tree = GameTree::new(
            start.clone(),
            oracle.fullmove_number_of(&start),
            oracle.turn_of(&start),
        );
        tree.node_mut(NodeId::ROOT)?.append_comment(&segment.text);
        ParsedGame {
            tree,
            diagnostics: Vec::new(),
        }
    } else {
        let body = match parse_game_header(&segment.text) {
            Some(header) => {
                headers.white = header.white;
                headers.black = header.black;
                headers.date = header.date;
                segment.text[header.end..].trim()
            }
            None => segment.text.as_str(),
        };
        parse_with(body, config, oracle)?
    };

    let pgn = write_pgn(&game, &headers);
    Ok(BookGame {
        title: segment.title.clone(),
        headers,
        game,
        pgn,
    })
}

/// Convert a whole book: chapters, then games, each to its own PGN.
pub fn convert_book(text: &str, config: &ParserConfig) -> Result<Vec<BookGame>, NotationError> {
    let oracle: ShakmatyOracle = oracle_for(config)?;
    let chapters = extract_chapters(text, config.min_chapter_length);
    info!(chapters = chapters.len(), "Chapters extracted");

    let mut games = Vec::new();
    for chapter in &chapters {
        let segments = split_games(chapter);
        for segment in &segments {
            let converted = convert_segment(segment, config, &oracle)?;
            info!(
                title = %converted.title,
                nodes = converted.game.tree.len(),
                diagnostics = converted.game.diagnostics.len(),
                "Converted game"
            );
            games.push(converted);
        }
    }

    Ok(games)
}

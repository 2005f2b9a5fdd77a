//! PGN export: renders a parsed game tree as PGN movetext with headers.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::builder::ParsedGame;
use crate::token::Side;
use crate::tree::WalkEvent;

/// Movetext lines are wrapped at this width.
const LINE_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgnHeaders {
    pub event: String,
    pub site: String,
    pub date: String,
    pub white: String,
    pub black: String,
    pub result: String,
    /// Start position for games that do not begin from the initial setup.
    pub fen: Option<String>,
}

impl Default for PgnHeaders {
    fn default() -> Self {
        Self {
            event: "?".to_string(),
            site: "Chess Book".to_string(),
            date: "????.??.??".to_string(),
            white: "Study".to_string(),
            black: "Analysis".to_string(),
            result: "*".to_string(),
            fen: None,
        }
    }
}

/// Render `game` as a single PGN game.
pub fn write_pgn<P>(game: &ParsedGame<P>, headers: &PgnHeaders) -> String {
    let mut out = String::new();

    let mut tags = vec![
        ("Event", headers.event.as_str()),
        ("Site", headers.site.as_str()),
        ("Date", headers.date.as_str()),
        ("White", headers.white.as_str()),
        ("Black", headers.black.as_str()),
        ("Result", headers.result.as_str()),
    ];
    if let Some(fen) = headers.fen.as_deref() {
        tags.push(("SetUp", "1"));
        tags.push(("FEN", fen));
    }
    for (name, value) in tags {
        out.push_str(&format!("[{name} \"{}\"]\n", escape_tag(value)));
    }
    out.push('\n');

    let mut words = movetext(game);
    words.push(headers.result.clone());
    out.push_str(&wrap(&words));
    out.push('\n');
    out
}

/// Movetext words in order, without the result terminator.
fn movetext<P>(game: &ParsedGame<P>) -> Vec<String> {
    let mut words = Vec::new();

    if let Some(comment) = game.tree.root().comment.as_deref() {
        words.extend(comment_words(comment));
    }
    // Black moves need an explicit "N..." after a break in the movetext.
    let mut need_number = true;

    for event in game.tree.walk() {
        match event {
            WalkEvent::Move {
                node,
                starts_variation,
            } => {
                let Some(mv) = node.mv.as_ref() else {
                    continue;
                };
                if starts_variation {
                    words.push("(".to_string());
                    need_number = true;
                }
                match node.mover() {
                    Side::White => words.push(format!("{}.", node.move_number())),
                    Side::Black if need_number => {
                        words.push(format!("{}...", node.move_number()))
                    }
                    Side::Black => {}
                }
                words.push(mv.san.clone());
                if let Some(glyph) = mv.glyph {
                    words.push(format!("${}", glyph.nag()));
                }
                need_number = false;

                if let Some(comment) = node.comment.as_deref() {
                    words.extend(comment_words(comment));
                    need_number = true;
                }
            }
            WalkEvent::EndVariation => {
                words.push(")".to_string());
                need_number = true;
            }
        }
    }

    words
}

/// A brace comment split at whitespace so long commentary wraps with the
/// moves.
fn comment_words(comment: &str) -> Vec<String> {
    let safe = comment.replace('{', "(").replace('}', ")");
    let mut words: Vec<String> = safe.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return vec!["{}".to_string()];
    }
    words[0].insert(0, '{');
    if let Some(last) = words.last_mut() {
        last.push('}');
    }
    words
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn wrap(words: &[String]) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    let mut previous: Option<&str> = None;
    for word in words {
        // No space after "(" or before ")".
        let glue = word == ")" || previous == Some("(");
        previous = Some(word.as_str());
        if line_len > 0 && !glue && line_len + 1 + word.len() > LINE_WIDTH {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 && !glue {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(word);
        line_len += word.len();
    }
    out
}

/// Extract a string value from a PGN header.
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    let pattern = format!(r#"\[{}\s+"((?:[^"\\]|\\.)*)"\]"#, regex::escape(header_name));
    let re = Regex::new(&pattern).ok()?;
    let value = re.captures(pgn)?.get(1)?.as_str();
    if value.is_empty() {
        None
    } else {
        Some(value.replace("\\\"", "\"").replace("\\\\", "\\"))
    }
}

//! Tokenizer for book text: splits prose and move notation into an ordered
//! token stream.
//!
//! Notation may be packed without spaces ("12...Nxe4!?", "1.e4e5") and may
//! sit in the middle of commentary. Anything that looks like a move but cannot
//! be read as one (glued to a word, bare SAN with no White move to answer)
//! stays in the surrounding text.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::token::{Glyph, MarkerSource, MoveToken, Side, TextToken, Token};

const SAN_PATTERN: &str = r"(?:O-O-O|O-O|0-0-0|0-0|[KQRBN][a-h]?[1-8]?x?[a-h][1-8]|[a-h](?:x[a-h])?[1-8](?:=?[QRBN])?)[+#]?";

/// Dots after a move number. "4. ... Be7" is a Black move, so a spaced dot
/// run is tried before a lone White dot.
const DOTS_PATTERN: &str = r"\.\s*(?:\.\.\.?|…)|\.\.\.|\.\.|\.|…";

fn move_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?:(?P<num>\d+)(?P<dots>{DOTS_PATTERN})\s*)?(?P<san>{SAN_PATTERN})(?P<glyph>[!?]{{1,2}})?"
        );
        Regex::new(&pattern).expect("move pattern is valid")
    })
}

/// Matches when a move (numbered or bare) starts at the beginning of the slice.
fn move_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"^(?:\d+(?:{DOTS_PATTERN})\s*)?{SAN_PATTERN}");
        Regex::new(&pattern).expect("move start pattern is valid")
    })
}

fn move_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\s*(?:\.|…)").expect("move number pattern is valid"))
}

/// Split raw book text into move and text tokens, in source order.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    // End of the last accepted move token; text before it is already emitted.
    let mut consumed = 0usize;
    let mut last_move: Option<(u32, Side, usize)> = None;

    for caps in move_re().captures_iter(text) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let (start, end) = (whole.start(), whole.end());

        if !leading_boundary_ok(text, start, consumed, last_move.is_some()) {
            continue;
        }
        if !trailing_boundary_ok(text, end) {
            continue;
        }

        let Some((move_number, marker, marker_source)) = classify(&caps, text, last_move) else {
            continue;
        };

        let san_text = match caps.name("san") {
            Some(san) => normalize_san(san.as_str()),
            None => continue,
        };
        let suffix = caps.name("glyph").and_then(|g| Glyph::parse(g.as_str()));

        push_text(&mut tokens, text, consumed, start);
        tokens.push(Token::Move(MoveToken {
            move_number,
            marker,
            marker_source,
            san_text,
            suffix,
            span: start..end,
        }));
        consumed = end;
        last_move = Some((move_number, marker, end));
    }

    push_text(&mut tokens, text, consumed, text.len());
    tokens
}

fn leading_boundary_ok(text: &str, start: usize, consumed: usize, after_move: bool) -> bool {
    if start == 0 || (after_move && start == consumed) {
        return true;
    }
    match text[..start].chars().next_back() {
        Some(c) => !c.is_alphanumeric() && c != '-' && c != '=',
        None => true,
    }
}

fn trailing_boundary_ok(text: &str, end: usize) -> bool {
    let rest = &text[end..];
    match rest.chars().next() {
        None => true,
        Some(c) if c.is_alphanumeric() => move_start_re().is_match(rest),
        Some(c) => c != '-' && c != '=',
    }
}

/// Decide the move number and side for a match, or `None` when the match must
/// stay in the text.
fn classify(
    caps: &Captures<'_>,
    text: &str,
    last_move: Option<(u32, Side, usize)>,
) -> Option<(u32, Side, MarkerSource)> {
    if let (Some(num), Some(dots)) = (caps.name("num"), caps.name("dots")) {
        let number: u32 = num.as_str().parse().ok()?;
        if number == 0 {
            return None;
        }
        let side = if dots.as_str() == "." {
            Side::White
        } else {
            Side::Black
        };
        return Some((number, side, MarkerSource::Explicit));
    }

    // Bare SAN: only a reply to the White move just before it.
    let (number, side, last_end) = last_move?;
    if side != Side::White {
        return None;
    }
    let start = caps.get(0)?.start();
    let gap = text.get(last_end..start)?;
    if move_number_re().is_match(gap) {
        return None;
    }
    Some((number, Side::Black, MarkerSource::Inferred))
}

fn normalize_san(raw: &str) -> String {
    let mut san = raw.replace("0-0-0", "O-O-O").replace("0-0", "O-O");
    // "e8Q" -> "e8=Q"
    let bytes = san.as_bytes();
    if let Some(idx) = bytes.iter().position(|b| matches!(b, b'Q' | b'R' | b'B' | b'N')) {
        let is_pawn_move = bytes.first().is_some_and(|b| (b'a'..=b'h').contains(b));
        if is_pawn_move && idx > 0 && bytes[idx - 1] != b'=' {
            san.insert(idx, '=');
        }
    }
    san
}

fn push_text(tokens: &mut Vec<Token>, text: &str, from: usize, to: usize) {
    if from >= to {
        return;
    }
    let raw = &text[from..to];
    if raw.trim().is_empty() {
        return;
    }
    tokens.push(Token::Text(TextToken {
        text: raw.trim().to_string(),
        span: from..to,
    }));
}

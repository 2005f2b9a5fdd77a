//! Convert the extracted text of a chess book into PGN (or JSON trees).
//!
//! Usage:
//!   book-to-pgn <book.txt> [--output <file>] [--json] [--single]
//!
//! `--single` parses the whole text as one game instead of splitting it into
//! chapters and games. Parser tuning comes from `BOOK_*` environment
//! variables (a `.env` file is loaded first).

use std::env;
use std::fs;

use anyhow::{bail, Context};
use book_notation::chapters::{convert_segment, GameSegment};
use book_notation::tree_json::game_to_json;
use book_notation::{convert_book, oracle_for, BookGame, ParserConfig};
use tracing::{info, warn};

struct Args {
    input: String,
    output: Option<String>,
    json: bool,
    single: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut input = None;
    let mut output = None;
    let mut json = false;
    let mut single = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                output = Some(args.next().context("--output needs a file path")?);
            }
            "--json" => json = true,
            "--single" => single = true,
            other if other.starts_with('-') => bail!("unknown flag {other}"),
            other => {
                if input.replace(other.to_string()).is_some() {
                    bail!("only one input file is supported");
                }
            }
        }
    }

    Ok(Args {
        input: input
            .context("usage: book-to-pgn <book.txt> [--output <file>] [--json] [--single]")?,
        output,
        json,
        single,
    })
}

fn convert(text: &str, config: &ParserConfig, single: bool) -> anyhow::Result<Vec<BookGame>> {
    if !single {
        return Ok(convert_book(text, config)?);
    }
    let oracle = oracle_for(config)?;
    let segment = GameSegment {
        title: "Extracted Game".to_string(),
        text: text.to_string(),
        is_preamble: false,
    };
    Ok(vec![convert_segment(&segment, config, &oracle)?])
}

fn render(games: &[BookGame], json: bool) -> anyhow::Result<String> {
    if !json {
        return Ok(games
            .iter()
            .map(|g| g.pgn.as_str())
            .collect::<Vec<_>>()
            .join("\n"));
    }
    let entries: Vec<serde_json::Value> = games
        .iter()
        .map(|g| {
            serde_json::json!({
                "title": g.title,
                "headers": g.headers,
                "game": game_to_json(&g.game),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args = parse_args()?;
    let config = ParserConfig::from_env()?;

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input))?;
    info!(path = %args.input, chars = text.len(), "Loaded book text");

    let games = convert(&text, &config, args.single)?;
    let flagged = games.iter().filter(|g| !g.game.diagnostics.is_empty()).count();
    if flagged > 0 {
        warn!(games = flagged, "Some games have skipped or uncertain moves");
    }

    let rendered = render(&games, args.json)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("writing {path}"))?;
            info!(path = %path, games = games.len(), "Wrote output");
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

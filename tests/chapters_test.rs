//! Integration tests: whole-book conversion into chapter PGNs.

mod common;

use book_notation::chapters::{extract_chapters, split_games};
use book_notation::{convert_book, ParserConfig};
use common::read_back;

const BOOK: &str = "\
Foreword
This collection follows the development of the Open Games from the romantic era \
to modern practice, with commentary on each decisive moment.

Chapter 1 The King's Gambit
Romantic chess at its most direct.
Game 1 Anderssen-Kieseritzky London 1851 1.e4 e5 2.f4 exf4 3.Bc4 Qh4+ 4.Kf1 b5
The famous Immortal Game.
Game 2 1.e4 e5 2.f4 d5 The Falkbeer. 3.exd5 e4

Chapter 2 Quiet Systems
1.e4 e5 2.Nf3 Nc6 3.Bc4 Bc5 4.c3 Nf6 5.d3 d6 Slow manoeuvring follows.

Chapter 3
Too short.
";

#[test]
fn test_book_is_split_into_chapters() {
    let chapters = extract_chapters(BOOK, ParserConfig::default().min_chapter_length);
    let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Introduction",
            "Chapter 1 The King's Gambit",
            "Chapter 2 Quiet Systems"
        ]
    );

    let games = split_games(&chapters[1]);
    let titles: Vec<&str> = games.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Chapter 1 The King's Gambit - Game 1", "Chapter 1 The King's Gambit - Game 2"]
    );
}

#[test]
fn test_convert_book_end_to_end() {
    let games = convert_book(BOOK, &ParserConfig::default()).unwrap();
    let titles: Vec<&str> = games.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Introduction",
            "Chapter 1 The King's Gambit - Game 1",
            "Chapter 1 The King's Gambit - Game 2",
            "Chapter 2 Quiet Systems"
        ]
    );

    let immortal = &games[1];
    assert_eq!(immortal.headers.white, "Anderssen");
    assert_eq!(immortal.headers.black, "Kieseritzky");
    assert_eq!(immortal.headers.date, "1851.??.??");
    assert_eq!(
        immortal.game.tree.main_line_san(),
        vec!["e4", "e5", "f4", "exf4", "Bc4", "Qh4+", "Kf1", "b5"]
    );

    let falkbeer = &games[2];
    assert_eq!(falkbeer.headers.white, "Study");
    assert_eq!(
        falkbeer.game.tree.main_line_san(),
        vec!["e4", "e5", "f4", "d5", "exd5", "e4"]
    );

    for game in &games {
        let seen = read_back(&game.pgn);
        assert_eq!(seen.event, game.title);
        assert_eq!(seen.sans, game.game.tree.len() - 1, "{}", game.pgn);
        assert_eq!(seen.illegal, 0);
    }
}

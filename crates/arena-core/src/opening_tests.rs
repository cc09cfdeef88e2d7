use super::*;
use std::collections::HashSet;
use std::io::Write;

const BOOK: &str = "\
# a few short lines
e2e4 e7e5 g1f3 b8c6 f1b5 a7a6 b5a4 g8f6 e1g1 f8e7
d2d4 d7d5 c2c4

rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - ; id \"king pawn\";
";

#[test]
fn test_parse_moves_and_epd() {
    let openings = OpeningBook::parse(BOOK, 8).unwrap();
    assert_eq!(openings.len(), 3);
    assert_eq!(openings[0].moves.len(), 8, "truncated to max plies");
    assert_eq!(openings[1].moves, vec!["d2d4", "d7d5", "c2c4"]);
    assert_eq!(
        openings[2].fen.as_deref(),
        Some("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
    );
}

#[test]
fn test_full_fen_keeps_counters() {
    let openings = OpeningBook::parse("8/8/8/4k3/8/4K3/8/R7 w - - 12 40", 8).unwrap();
    assert_eq!(openings[0].fen.as_deref(), Some("8/8/8/4k3/8/4K3/8/R7 w - - 12 40"));
}

#[test]
fn test_bad_line_reports_line_number() {
    let err = OpeningBook::parse("e2e4 e7e5\n\ne2e4 e2e4\n", 8).unwrap_err();
    match err {
        OpeningError::Parse { line, .. } => assert_eq!(line, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_seeded_book_is_reproducible() {
    let openings = OpeningBook::parse(BOOK, 8).unwrap();
    let mut a = OpeningBook::new(openings.clone(), Some(7)).unwrap();
    let mut b = OpeningBook::new(openings, Some(7)).unwrap();
    for _ in 0..10 {
        assert_eq!(a.next_opening(), b.next_opening());
    }
}

#[test]
fn test_book_draws_cover_entries() {
    let openings = OpeningBook::parse(BOOK, 8).unwrap();
    let mut book = OpeningBook::new(openings, Some(1)).unwrap();
    let seen: HashSet<_> = (0..100).map(|_| book.next_opening()).collect();
    assert_eq!(seen.len(), 3);
}

#[test]
fn test_empty_book_rejected() {
    assert!(OpeningBook::new(Vec::new(), None).is_err());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# nothing here").unwrap();
    let err = OpeningBook::load(file.path(), 8, None).unwrap_err();
    assert!(matches!(err, OpeningError::Empty(_)));
}

#[test]
fn test_start_position_source() {
    assert_eq!(StartPosition.next_opening(), Opening::startpos());
}

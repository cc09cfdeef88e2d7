//! The rules collaborator: legality checks and game-end detection.
//!
//! The runner never looks at a board itself. It hands moves to an
//! [`Arbiter`] and asks it whether the game is over. [`CozyArbiter`] is the
//! adapter backed by `cozy-chess`.

use cozy_chess::{Board, File, Move, Piece, Square};

use crate::error::{IllegalMove, OpeningError};
use crate::game::{GameOutcome, Opening, Side, Termination};

/// Final result of a game as decided by the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: GameOutcome,
    pub termination: Termination,
}

impl Verdict {
    fn draw(termination: Termination) -> Self {
        Self {
            outcome: GameOutcome::Draw,
            termination,
        }
    }
}

pub trait Arbiter: Send {
    fn side_to_move(&self) -> Side;

    /// Full-move number of the position (starts at 1, increments after Black)
    fn fullmove_number(&self) -> u32;

    fn fen(&self) -> String;

    /// Apply a move given in UCI notation, rejecting it if it is illegal.
    fn play(&mut self, uci: &str) -> Result<(), IllegalMove>;

    /// `Some` once the game is over: checkmate, stalemate, insufficient
    /// material, or a claimable draw (threefold repetition, fifty moves).
    fn verdict(&self) -> Option<Verdict>;
}

/// [`Arbiter`] backed by a `cozy_chess::Board` plus the position history
/// needed for repetition claims.
#[derive(Debug, Clone)]
pub struct CozyArbiter {
    board: Board,
    /// Hashes of positions since the last irreversible move
    history: Vec<u64>,
}

impl CozyArbiter {
    pub fn new(opening: &Opening) -> Result<Self, OpeningError> {
        let board = match &opening.fen {
            Some(fen) => Board::from_fen(fen, false)
                .map_err(|e| OpeningError::Invalid(format!("bad FEN `{}`: {:?}", fen, e)))?,
            None => Board::default(),
        };
        let mut arbiter = Self {
            history: vec![board.hash()],
            board,
        };
        for mv in &opening.moves {
            arbiter
                .play(mv)
                .map_err(|e| OpeningError::Invalid(e.to_string()))?;
        }
        Ok(arbiter)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    fn illegal(&self, uci: &str) -> IllegalMove {
        IllegalMove {
            mv: uci.to_string(),
            fen: self.board.to_string(),
        }
    }

    fn has_legal_move(&self) -> bool {
        self.board
            .generate_moves(|moves| moves.into_iter().next().is_some())
    }

    fn repetitions(&self) -> usize {
        let current = self.board.hash();
        self.history.iter().filter(|&&h| h == current).count()
    }
}

impl Arbiter for CozyArbiter {
    fn side_to_move(&self) -> Side {
        self.board.side_to_move().into()
    }

    fn fullmove_number(&self) -> u32 {
        u32::from(self.board.fullmove_number())
    }

    fn fen(&self) -> String {
        self.board.to_string()
    }

    fn play(&mut self, uci: &str) -> Result<(), IllegalMove> {
        let mv = parse_uci_move(&self.board, uci).ok_or_else(|| self.illegal(uci))?;
        if !self.board.is_legal(mv) {
            return Err(self.illegal(uci));
        }
        self.board.play_unchecked(mv);
        if self.board.halfmove_clock() == 0 {
            self.history.clear();
        }
        self.history.push(self.board.hash());
        Ok(())
    }

    fn verdict(&self) -> Option<Verdict> {
        if !self.has_legal_move() {
            return Some(if self.board.checkers().is_empty() {
                Verdict::draw(Termination::Stalemate)
            } else {
                Verdict {
                    outcome: GameOutcome::win_for(self.side_to_move().opposite()),
                    termination: Termination::Checkmate,
                }
            });
        }
        if insufficient_material(&self.board) {
            return Some(Verdict::draw(Termination::InsufficientMaterial));
        }
        if self.board.halfmove_clock() >= 100 {
            return Some(Verdict::draw(Termination::FiftyMoveRule));
        }
        if self.repetitions() >= 3 {
            return Some(Verdict::draw(Termination::Repetition));
        }
        None
    }
}

/// Parse a UCI move. Standard castling notation (`e1g1`) is translated to
/// the king-takes-rook form `cozy-chess` uses internally.
pub fn parse_uci_move(board: &Board, uci: &str) -> Option<Move> {
    let mut mv: Move = uci.parse().ok()?;
    if board.piece_on(mv.from) == Some(Piece::King)
        && mv.from.file() == File::E
        && mv.to.rank() == mv.from.rank()
    {
        let rook_file = match mv.to.file() {
            File::G => Some(File::H),
            File::C => Some(File::A),
            _ => None,
        };
        if let Some(file) = rook_file {
            mv.to = Square::new(file, mv.from.rank());
        }
    }
    Some(mv)
}

/// Format a legal move in standard UCI notation.
pub fn format_uci_move(board: &Board, mv: Move) -> String {
    let mover = board.side_to_move();
    let castles = board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.to) == Some(mover);
    if castles {
        let file = if mv.to.file() as usize > mv.from.file() as usize {
            File::G
        } else {
            File::C
        };
        let to = Square::new(file, mv.from.rank());
        return Move {
            from: mv.from,
            to,
            promotion: None,
        }
        .to_string();
    }
    mv.to_string()
}

fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if (knights | bishops).len() <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }
    // Bishops only: a draw when they all live on one square colour.
    let mut colours = bishops
        .into_iter()
        .map(|sq| (sq.file() as usize + sq.rank() as usize) % 2);
    match colours.next() {
        Some(first) => colours.all(|c| c == first),
        None => true,
    }
}

#[cfg(test)]
#[path = "arbiter_tests.rs"]
mod arbiter_tests;

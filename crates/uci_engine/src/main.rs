//! Sparring partner for the arena: a UCI engine that plays random legal
//! moves and can be told to misbehave on a given move.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cozy_chess::{Board, Move, Piece};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use arena_core::arbiter::format_uci_move;
use arena_core::{CozyArbiter, Opening};

#[derive(Debug, Clone, Parser)]
#[command(name = "uci_engine", about = "Random-move UCI engine with fault injection")]
struct Args {
    /// Name reported in `id name`
    #[arg(long, default_value = "Sparring")]
    name: String,

    /// RNG seed, reapplied on every `ucinewgame` (the `Seed` option overrides it)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Take mates and captures when they are available
    #[arg(long)]
    greedy: bool,

    /// Sleep this long before answering `go`
    #[arg(long, default_value_t = 0)]
    think_ms: u64,

    /// Exit without answering on the Nth `go` of a game
    #[arg(long)]
    crash_at: Option<u32>,

    /// Go silent on the Nth `go` of a game, ignoring even `quit`
    #[arg(long)]
    hang_at: Option<u32>,

    /// Answer the Nth `go` of a game with an illegal move
    #[arg(long)]
    illegal_at: Option<u32>,
}

struct Engine {
    args: Args,
    seed: u64,
    rng: StdRng,
    position: Opening,
    searches: u32,
}

enum Reply {
    Continue,
    Quit,
    Hang,
}

impl Engine {
    fn new(args: Args) -> Self {
        let seed = args.seed;
        Self {
            args,
            seed,
            rng: StdRng::seed_from_u64(seed),
            position: Opening::startpos(),
            searches: 0,
        }
    }

    fn handle(&mut self, line: &str, out: &mut impl Write) -> Result<Reply> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            return Ok(Reply::Continue);
        };

        match command {
            "uci" => {
                writeln!(out, "id name {}", self.args.name)?;
                writeln!(out, "id author arena")?;
                writeln!(
                    out,
                    "option name Seed type spin default {} min 0 max {}",
                    self.args.seed,
                    u32::MAX
                )?;
                writeln!(out, "uciok")?;
            }
            "isready" => writeln!(out, "readyok")?,
            "setoption" => self.set_option(&parts[1..]),
            "ucinewgame" => {
                self.rng = StdRng::seed_from_u64(self.seed);
                self.position = Opening::startpos();
                self.searches = 0;
            }
            "position" => self.position = parse_position(&parts[1..]),
            "go" => {
                self.searches += 1;
                let n = Some(self.searches);
                if n == self.args.crash_at {
                    eprintln!("simulated crash on search {}", self.searches);
                    std::process::exit(3);
                }
                if n == self.args.hang_at {
                    return Ok(Reply::Hang);
                }
                if self.args.think_ms > 0 {
                    std::thread::sleep(Duration::from_millis(self.args.think_ms));
                }
                let reply = self.search(n == self.args.illegal_at);
                writeln!(out, "info depth 1 score cp 0 nodes 1 pv {}", reply)?;
                writeln!(out, "bestmove {}", reply)?;
            }
            "quit" => return Ok(Reply::Quit),
            // `stop` arrives after every answer has already been sent
            _ => {}
        }
        out.flush()?;
        Ok(Reply::Continue)
    }

    fn set_option(&mut self, parts: &[&str]) {
        // setoption name <name> value <value>
        let name = parts.iter().position(|&p| p == "name");
        let value = parts.iter().position(|&p| p == "value");
        if let (Some(n), Some(v)) = (name, value) {
            let option = parts[n + 1..v].join(" ");
            if option.eq_ignore_ascii_case("seed") {
                if let Some(seed) = parts.get(v + 1).and_then(|s| s.parse().ok()) {
                    self.seed = seed;
                    self.rng = StdRng::seed_from_u64(seed);
                }
            }
        }
    }

    fn search(&mut self, illegal: bool) -> String {
        let Ok(arbiter) = CozyArbiter::new(&self.position) else {
            return "0000".to_string();
        };
        let board = arbiter.board();
        let mut moves = Vec::new();
        board.generate_moves(|piece_moves| {
            moves.extend(piece_moves);
            false
        });
        if moves.is_empty() {
            return "0000".to_string();
        }

        let mv = if self.args.greedy {
            greedy_move(board, &moves)
        } else {
            None
        };
        let mv = match mv.or_else(|| moves.choose(&mut self.rng).copied()) {
            Some(mv) => mv,
            None => return "0000".to_string(),
        };

        if illegal {
            // a piece "moving" onto its own square is never legal
            return format!("{}{}", mv.from, mv.from);
        }
        format_uci_move(board, mv)
    }
}

fn piece_value(piece: Piece) -> u32 {
    match piece {
        Piece::Pawn => 1,
        Piece::Knight | Piece::Bishop => 3,
        Piece::Rook => 5,
        Piece::Queen => 9,
        Piece::King => 0,
    }
}

/// Mate in one if there is one, otherwise the most valuable capture.
fn greedy_move(board: &Board, moves: &[Move]) -> Option<Move> {
    let mates = moves.iter().copied().find(|&mv| {
        let mut next = board.clone();
        next.play_unchecked(mv);
        !next.checkers().is_empty()
            && !next.generate_moves(|moves| moves.into_iter().next().is_some())
    });
    if mates.is_some() {
        return mates;
    }
    moves
        .iter()
        .copied()
        .filter(|mv| board.color_on(mv.to) == Some(!board.side_to_move()))
        .max_by_key(|mv| board.piece_on(mv.to).map_or(0, piece_value))
}

fn parse_position(parts: &[&str]) -> Opening {
    let moves_at = parts.iter().position(|&p| p == "moves");
    let head = &parts[..moves_at.unwrap_or(parts.len())];
    let mut opening = match head.first() {
        Some(&"fen") => Opening::from_fen(head[1..].join(" ")),
        _ => Opening::startpos(),
    };
    if let Some(i) = moves_at {
        opening.moves = parts[i + 1..].iter().map(|m| m.to_string()).collect();
    }
    opening
}

fn main() -> Result<()> {
    let mut engine = Engine::new(Args::parse());
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut lines = stdin.lock().lines();
    while let Some(line) = lines.next() {
        match engine.handle(line?.trim(), &mut stdout)? {
            Reply::Continue => {}
            Reply::Quit => break,
            Reply::Hang => {
                // keep draining input so the arena sees a live but silent engine
                for _ in lines.by_ref() {}
                break;
            }
        }
    }
    Ok(())
}

use halogen::board::{Board, Color, Piece};
use halogen::book::PolyglotBook;
use halogen::moves::execute::{generate_legal, make_move_basic};
use halogen::moves::magic::MagicTables;
use halogen::moves::magic::loader::load_magic_tables;
use halogen::moves::types::Move;
use halogen::search::search::search;
use halogen::search::shared::{MultiPvReport, SearchSharedState, format_score, search_multipv, search_threaded};
use halogen::search::tt::TranspositionTable;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// The engine's configurable UCI options (`spec.md` §6 `setoption`).
/// `hash_mb` changes require rebuilding the table; the rest are read
/// fresh by every `go`.
struct UciOptions {
    hash_mb: usize,
    threads: usize,
    multipv: usize,
    syzygy_path: Option<String>,
    chess960: bool,
}

impl Default for UciOptions {
    fn default() -> Self {
        Self {
            hash_mb: 128,
            threads: 1,
            multipv: 1,
            syzygy_path: None,
            chess960: false,
        }
    }
}

fn main() {
    // Load magic tables once at startup
    let magic_tables = load_magic_tables();

    let mut board = Board::new(); // Start position
    let mut options = UciOptions::default();
    let mut tt = Arc::new(TranspositionTable::new(options.hash_mb));
    let stop_flag = Arc::new(AtomicBool::new(false));

    let book = PolyglotBook::load("book.bin").ok();
    if book.is_some() {
        println!("info string Opening Book loaded successfully");
    } else {
        println!("info string No opening book found (book.bin), running engine only");
    }

    // Main UCI loop
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l.trim().to_string(),
            Err(_) => break,
        };

        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let command = parts[0];

        match command {
            "uci" => handle_uci(),
            "isready" => println!("readyok"),
            "setoption" => handle_setoption(&parts, &mut options, &mut tt),
            "ucinewgame" => {
                board = Board::new();
                Arc::get_mut(&mut tt)
                    .expect("tt shared while idle")
                    .clear();
            }
            "position" => {
                if let Some(new_board) = handle_position(&parts, &magic_tables, options.chess960) {
                    board = new_board;
                }
            }
            "go" => {
                stop_flag.store(false, Ordering::Release);
                handle_go(&parts, &board, &magic_tables, &tt, &options, &stop_flag, &book);
            }
            "stop" => {
                stop_flag.store(true, Ordering::Release);
            }
            "fen" => {
                println!("{}", board.to_fen());
            }
            "quit" => break,
            "d" | "display" => {
                println!("{}", board);
            }
            "test" | "bench" => {
                let tt_mut = Arc::get_mut(&mut tt).expect("tt shared while idle");
                run_epd_tests("../bench_arena/bk.epd", &magic_tables, tt_mut);
            }
            _ => {}
        }
    }
}

fn handle_uci() {
    println!("id name Halogen 1.0");
    println!("id author Halogen Authors");
    println!("option name Hash type spin default 128 min 1 max 65536");
    println!("option name Threads type spin default 1 min 1 max 512");
    println!("option name MultiPV type spin default 1 min 1 max 256");
    println!("option name SyzygyPath type string default <empty>");
    println!("option name EvalFile type string default <empty>");
    println!("option name UCI_Chess960 type check default false");
    println!("uciok");
}

/// `setoption name <N> value <V>` (`spec.md` §6). Option names may contain
/// spaces, so the name/value split happens on the `value` token rather
/// than by fixed position.
fn handle_setoption(parts: &[&str], options: &mut UciOptions, tt: &mut Arc<TranspositionTable>) {
    let name_idx = match parts.iter().position(|&p| p == "name") {
        Some(i) => i + 1,
        None => return,
    };
    let value_idx = parts.iter().position(|&p| p == "value");
    let name_end = value_idx.unwrap_or(parts.len());
    if name_idx >= name_end {
        return;
    }
    let name = parts[name_idx..name_end].join(" ");
    let value = value_idx.map(|vi| parts[vi + 1..].join(" ")).unwrap_or_default();

    match name.as_str() {
        "Hash" => {
            if let Ok(mb) = value.parse::<usize>() {
                let mb = mb.clamp(1, 65536);
                options.hash_mb = mb;
                *tt = Arc::new(TranspositionTable::new(mb));
            }
        }
        "Threads" => {
            if let Ok(n) = value.parse::<usize>() {
                options.threads = n.clamp(1, 512);
            }
        }
        "MultiPV" => {
            if let Ok(n) = value.parse::<usize>() {
                options.multipv = n.clamp(1, 256);
            }
        }
        "SyzygyPath" => {
            options.syzygy_path = if value.is_empty() || value == "<empty>" {
                None
            } else {
                Some(value)
            };
            // Adapter construction is thin glue left to a real Pyrrhic
            // binding (`search::tb`); recording the path is enough to
            // make the option round-trip through `setoption`/`uci`.
        }
        "EvalFile" => {
            if !value.is_empty() && value != "<empty>" {
                if let Err(e) = halogen::nnue::set_network_from_path(&value) {
                    eprintln!("info string Failed to load EvalFile '{}': {}", value, e);
                }
            }
        }
        "UCI_Chess960" => {
            options.chess960 = value.eq_ignore_ascii_case("true");
        }
        _ => {}
    }
}

fn handle_position(parts: &[&str], tables: &MagicTables, chess960: bool) -> Option<Board> {
    let mut board = if parts.len() > 1 && parts[1] == "startpos" {
        Board::new()
    } else if parts.len() > 1 && parts[1] == "fen" {
        let fen_start = 2;
        let mut fen_end = parts.len();
        for (i, &part) in parts.iter().enumerate().skip(fen_start) {
            if part == "moves" {
                fen_end = i;
                break;
            }
        }

        let fen_string = parts[fen_start..fen_end].join(" ");
        Board::from_str(&fen_string).ok()?
    } else {
        Board::new()
    };

    // Apply moves if any
    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for move_str in &parts[moves_idx + 1..] {
            if let Some(mv) = parse_uci_move(&board, move_str, tables, chess960) {
                make_move_basic(&mut board, mv);
            } else {
                eprintln!("Invalid move: {}", move_str);
                return None;
            }
        }
    }

    Some(board)
}

/// The king's classical two-square-hop destination for a castling move.
/// `mv.to` carries the rook's starting square (Chess960-friendly), so
/// matching a classic (`UCI_Chess960` off) "e1g1"-style move string needs
/// this derived separately (`spec.md` §6 "castling is emitted as king
/// destination square (classic) or rook square (Chess960 ...)").
fn castle_king_destination(mv: &Move) -> usize {
    mv.classic_to_square().index() as usize
}

fn parse_uci_move(board: &Board, move_str: &str, tables: &MagicTables, chess960: bool) -> Option<Move> {
    if move_str.len() < 4 {
        return None;
    }

    let chars: Vec<char> = move_str.chars().collect();

    let from_file = (chars[0] as u8).wrapping_sub(b'a');
    let from_rank = (chars[1] as u8).wrapping_sub(b'1');
    let to_file = (chars[2] as u8).wrapping_sub(b'a');
    let to_rank = (chars[3] as u8).wrapping_sub(b'1');

    if from_file > 7 || from_rank > 7 || to_file > 7 || to_rank > 7 {
        return None;
    }

    let from_square = (from_rank * 8 + from_file) as usize;
    let to_square = (to_rank * 8 + to_file) as usize;

    let promo_piece = if move_str.len() >= 5 {
        match chars[4] {
            'q' => Some(halogen::board::Piece::Queen),
            'r' => Some(halogen::board::Piece::Rook),
            'b' => Some(halogen::board::Piece::Bishop),
            'n' => Some(halogen::board::Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mut moves = Vec::with_capacity(256);
    let mut scratch = Vec::with_capacity(256);
    let mut board_copy = board.clone();
    generate_legal(&mut board_copy, tables, &mut moves, &mut scratch);

    for mv in moves {
        // FIXED: Cast index() to usize for comparison
        let to_matches = if mv.is_castling() {
            if chess960 {
                (mv.to.index() as usize) == to_square
            } else {
                castle_king_destination(&mv) == to_square
            }
        } else {
            (mv.to.index() as usize) == to_square
        };
        if (mv.from.index() as usize) == from_square && to_matches {
            if promo_piece.is_some() {
                if mv.promotion == promo_piece {
                    return Some(mv);
                }
            } else if mv.promotion.is_none() {
                return Some(mv);
            }
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn handle_go(
    parts: &[&str],
    board: &Board,
    tables: &MagicTables,
    tt: &Arc<TranspositionTable>,
    options: &UciOptions,
    stop_flag: &Arc<AtomicBool>,
    book: &Option<PolyglotBook>,
) {
    // --- STEP A: Check Opening Book First ---
    // If we have a book, and the board position is in it, play immediately.
    if let Some(b) = book {
        if let Some(book_move) = b.probe(board) {
            println!("info string Book move found");
            println!("bestmove {}", book_move.to_uci(options.chess960));
            return; // EXIT IMMEDIATELY - Do not search!
        }
    }
    // ----------------------------------------
    let mut depth = 64;
    let mut time_limit = None;

    // Time Control Variables
    let mut wtime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut winc: u64 = 0;
    let mut binc: u64 = 0;
    let mut movestogo: Option<u64> = None;
    let mut movetime: Option<u64> = None;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if i + 1 < parts.len() {
                    depth = parts[i + 1].parse().unwrap_or(64);
                }
                i += 2;
            }
            "movetime" => {
                if i + 1 < parts.len() {
                    movetime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "wtime" => {
                if i + 1 < parts.len() {
                    wtime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "btime" => {
                if i + 1 < parts.len() {
                    btime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "winc" => {
                if i + 1 < parts.len() {
                    winc = parts[i + 1].parse().unwrap_or(0);
                }
                i += 2;
            }
            "binc" => {
                if i + 1 < parts.len() {
                    binc = parts[i + 1].parse().unwrap_or(0);
                }
                i += 2;
            }
            "movestogo" => {
                if i + 1 < parts.len() {
                    movestogo = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "infinite" => {
                depth = 100;
                time_limit = None;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    if let Some(ms) = movetime {
        time_limit = Some(Duration::from_millis(ms));
    } else {
        let (my_time, my_inc) = if board.side_to_move == Color::White {
            (wtime, winc)
        } else {
            (btime, binc)
        };

        if let Some(t) = my_time {
            // --- SAFETY BUFFER (Hidden from engine) ---
            // Reserve 15% of time or 500ms (whichever is smaller) for lag/OS overhead.
            // This time is INVISIBLE to the search engine.
            let safety_buffer = (t * 15 / 100).min(500);
            let usable_time = t.saturating_sub(safety_buffer);

            let mut alloc: u64;

            if let Some(mtg) = movestogo {
                let moves_to_plan = mtg.max(2);
                alloc = usable_time / moves_to_plan;
                alloc += (my_inc * 3) / 4;
            } else {
                // VERY CONSERVATIVE tiered allocation
                // Assume ~40 moves remaining in a typical game
                if usable_time > 5000 {
                    // Normal game: 1/40th of time + most of increment
                    alloc = usable_time / 40 + (my_inc * 9) / 10;
                } else if usable_time > 2000 {
                    // Low time: 1/30th
                    alloc = usable_time / 30 + (my_inc * 3) / 4;
                } else if usable_time > 500 {
                    // Very low: 1/20th
                    alloc = usable_time / 20 + my_inc / 2;
                } else {
                    // CRITICAL: Just use increment + tiny bit
                    alloc = my_inc / 2 + 20;
                }
            }

            // HARD CAP: Never use more than 20% of remaining time on one move
            // This prevents catastrophic time loss
            let hard_cap = usable_time / 5;
            alloc = alloc.min(hard_cap);

            // Also cap at usable time
            alloc = alloc.min(usable_time);

            // Minimum: Ensure we at least calculate for a tiny bit (10ms)
            if alloc < 10 && usable_time >= 10 {
                alloc = 10;
            }

            time_limit = Some(Duration::from_millis(alloc));
        }
    }

    if let Some(limit) = time_limit {
        println!("info string Target time: {}ms", limit.as_millis());
    }

    let chess960 = options.chess960;
    let best_move = if options.multipv > 1 {
        let results = search_multipv(
            board,
            tables,
            tt,
            options.multipv,
            depth,
            time_limit,
            Arc::clone(stop_flag),
            move |r| print_multipv_line(r, chess960),
        );
        results.first().and_then(|r| r.1)
    } else {
        let shared = SearchSharedState::new(Arc::clone(tt), Arc::clone(stop_flag));
        let (_score, best_move) = search_threaded(
            board,
            tables,
            &shared,
            options.threads,
            depth,
            time_limit,
            move |r| print_depth_line(r, chess960),
        );
        best_move
    };

    if let Some(m) = best_move {
        println!("bestmove {}", m.to_uci(chess960));
    } else {
        println!("bestmove 0000");
    }
}

fn print_depth_line(r: halogen::search::search::DepthReport, chess960: bool) {
    let pv_str = r
        .pv
        .iter()
        .map(|m| m.to_uci(chess960))
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "info depth {} seldepth {} score {} nodes {} nps {} hashfull {} tbhits {} time {} pv {}",
        r.depth,
        r.seldepth,
        format_score(r.score),
        r.nodes,
        r.nps,
        r.hashfull,
        r.tb_hits,
        r.time_ms,
        pv_str
    );
}

fn print_multipv_line(r: MultiPvReport, chess960: bool) {
    let pv_str = r
        .pv
        .iter()
        .map(|m| m.to_uci(chess960))
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "info depth {} seldepth {} multipv {} score {} nodes {} nps {} hashfull {} tbhits {} time {} pv {}",
        r.depth,
        r.seldepth,
        r.multipv_index,
        format_score(r.score),
        r.nodes,
        r.nps,
        r.hashfull,
        r.tb_hits,
        r.time_ms,
        pv_str
    );
}

// --- EPD Test Runner ---
fn run_epd_tests(path: &str, tables: &MagicTables, tt: &mut TranspositionTable) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => match File::open(format!("bench_arena/{}", path.split('/').last().unwrap())) {
            Ok(f) => f,
            Err(_) => {
                println!("Error: Could not find EPD file at '{}' or local.", path);
                return;
            }
        },
    };

    println!("Running Tactical Tests from {} (1s per position)...", path);
    println!("----------------------------------------------------");

    let reader = BufReader::new(file);
    let mut solved = 0;
    let mut total = 0;

    for (line_idx, line_res) in reader.lines().enumerate() {
        let line = line_res.unwrap_or_default();
        if line.trim().is_empty() {
            continue;
        }

        if let Some(bm_idx) = line.find(" bm ") {
            let fen = &line[..bm_idx].trim();
            let rest = &line[bm_idx + 4..];
            let move_end = rest.find(';').unwrap_or(rest.len());
            let san_move = rest[..move_end].trim();

            let mut board = match Board::from_str(fen) {
                Ok(b) => b,
                Err(_) => {
                    println!("Error parsing FEN on line {}", line_idx + 1);
                    continue;
                }
            };

            let expected_uci = san_to_uci(&mut board, san_move, tables);

            // Fixed 1.0s search for testing
            let time_limit = Some(Duration::from_millis(1000));
            let depth = 64;

            tt.clear();
            let (_score, best_move) = search(&mut board, tables, tt, depth, time_limit);

            let result_str = match best_move {
                Some(m) => m.to_uci(false),
                None => "none".to_string(),
            };

            let passed = if let Some(ref exp) = expected_uci {
                *exp == result_str
            } else {
                false
            };

            if passed {
                solved += 1;
            }
            total += 1;

            println!("Test #{}: {}", total, if passed { "PASS" } else { "FAIL" });
            if !passed {
                println!(
                    "   Expected: {} | Got: {}",
                    expected_uci.unwrap_or(san_move.to_string()),
                    result_str
                );
            }
        }
    }

    println!("----------------------------------------------------");
    println!("Result: {}/{} Solved", solved, total);
}

// --- Helper: Convert SAN to UCI ---
fn san_to_uci(board: &mut Board, san: &str, tables: &MagicTables) -> Option<String> {
    let mut moves = Vec::with_capacity(256);
    let mut scratch = Vec::with_capacity(256);
    generate_legal(board, tables, &mut moves, &mut scratch);

    let clean_san = san.replace("+", "").replace("#", "").replace("x", "");

    // Handle Castling
    if clean_san == "O-O" {
        return moves
            .iter()
            .find(|m| m.is_kingside_castle())
            .map(|m| m.to_uci(false));
    }
    if clean_san == "O-O-O" {
        return moves
            .iter()
            .find(|m| m.is_queenside_castle())
            .map(|m| m.to_uci(false));
    }

    if clean_san.len() < 2 {
        return None;
    }
    let target_str = &clean_san[clean_san.len() - 2..];

    let file = (target_str.chars().nth(0)? as u8).wrapping_sub(b'a');
    let rank = (target_str.chars().nth(1)? as u8).wrapping_sub(b'1');
    if file > 7 || rank > 7 {
        return None;
    }
    let target_sq = (rank * 8 + file) as usize;

    let first_char = clean_san.chars().next()?;
    let piece_type = match first_char {
        'N' => Piece::Knight,
        'B' => Piece::Bishop,
        'R' => Piece::Rook,
        'Q' => Piece::Queen,
        'K' => Piece::King,
        _ => Piece::Pawn,
    };

    let disambig_char = if piece_type == Piece::Pawn {
        if clean_san.len() > 2 && first_char.is_lowercase() {
            Some(first_char)
        } else {
            None
        }
    } else {
        let content = &clean_san[1..clean_san.len() - 2];
        if !content.is_empty() {
            content.chars().next()
        } else {
            None
        }
    };

    let candidates: Vec<&Move> = moves
        .iter()
        .filter(|m| {
            // FIXED: Cast index() to usize
            if (m.to.index() as usize) != target_sq {
                return false;
            }

            if let Some((_, p)) = board.piece_at(m.from) {
                if p != piece_type {
                    return false;
                }
            } else {
                return false;
            }

            if let Some(d) = disambig_char {
                let from_sq = m.from.index();
                let from_file = from_sq % 8;
                let from_rank = from_sq / 8;

                if d >= 'a' && d <= 'h' {
                    if from_file != (d as u8 - b'a') {
                        return false;
                    }
                } else if d >= '1' && d <= '8' {
                    if from_rank != (d as u8 - b'1') {
                        return false;
                    }
                }
            }
            true
        })
        .collect();

    if !candidates.is_empty() {
        Some(candidates[0].to_uci(false))
    } else {
        None
    }
}

//! Syzygy endgame-tablebase probe adapter (`spec.md` §4.9 step 3, §6
//! "Syzygy TB path").
//!
//! `spec.md` §1 lists the tablebase probe among the "thin glue" pieces
//! deliberately left outside this crate's hard-engineering scope: there is
//! no bundled `.rtbw`/`.rtbz` reader here, the same way the teacher never
//! shipped one. What the search needs is the *call site* — a typed probe
//! it can consult mid-recursion and at the root without caring whether a
//! real tablebase is mounted — so this module is a trait plus a no-op
//! default, grounded on `original_source/src/EGTB.cpp`'s `Syzygy::probe_wdl_search`
//! / `Syzygy::probe_dtz_root` shape (distance-from-root WDL probe in
//! search, best-move probe at root), minus the actual Pyrrhic binding.

use crate::board::Board;
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;
use crate::search::tt::MATE_THRESHOLD;

/// Scores at or beyond this are tablebase wins/losses rather than mates;
/// kept below `MATE_THRESHOLD` so `format_uci_score`'s mate-vs-cp split
/// still treats them as ordinary centipawn scores (`original_source`'s
/// `Score::tb_win_in`/`tb_loss_in` instead overlay the same score space
/// the mate score lives in; here they're kept one band below it).
pub const TB_WIN_SCORE: i32 = MATE_THRESHOLD - 1000;

/// A probed tablebase result, already oriented from the side-to-move's
/// perspective (win is good for the side to move).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TbResult {
    Loss,
    Draw,
    Win,
}

impl TbResult {
    /// `distance_from_root` biases the score the same way mate scores are
    /// biased, so a faster tablebase win/loss is preferred/avoided over a
    /// slower one reaching the same WDL class.
    pub fn to_score(self, distance_from_root: i32) -> i32 {
        match self {
            TbResult::Win => TB_WIN_SCORE - distance_from_root,
            TbResult::Loss => -TB_WIN_SCORE + distance_from_root,
            TbResult::Draw => 0,
        }
    }
}

/// The search's view of a tablebase: probeable mid-recursion (WDL, for
/// cutoffs/PV raises) and at the root (best move selection).
///
/// Implementors must be safe to share across search threads (`spec.md`
/// §4.10 every `SearchLocalState` holds one) — probing is read-only once
/// the backing files are loaded.
pub trait TbAdapter: Send + Sync {
    /// Piece count above which probing is skipped (`TB_LARGEST`); a
    /// no-op adapter reports 0 so every position is skipped.
    fn largest(&self) -> u32;

    /// `spec.md` §4.9 step 3: only called when castling rights are gone
    /// and `piece_count <= largest()`; the fifty-move/en-passant gating
    /// the original also applies is the caller's responsibility (mirrors
    /// `Syzygy::probe_wdl_search`'s own precondition checks).
    fn probe_wdl_search(&self, board: &Board, distance_from_root: i32) -> Option<i32>;

    /// Root-only: the tablebase's preferred move, if the position is
    /// within range and not ambiguous for DTZ purposes
    /// (`Syzygy::probe_dtz_root`).
    fn probe_root(&self, board: &Board, tables: &MagicTables) -> Option<Move>;
}

/// Default adapter when no `SyzygyPath` has been configured: every probe
/// is skipped, exactly as if `TB_LARGEST` were 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTbAdapter;

impl TbAdapter for NoopTbAdapter {
    fn largest(&self) -> u32 {
        0
    }

    fn probe_wdl_search(&self, _board: &Board, _distance_from_root: i32) -> Option<i32> {
        None
    }

    fn probe_root(&self, _board: &Board, _tables: &MagicTables) -> Option<Move> {
        None
    }
}

/// `spec.md` §4.9 step 3's preconditions: tablebases require no castling
/// rights left and a small enough piece count (the caller additionally
/// checks `halfmove_clock`/en passant where relevant, per the original's
/// `fifty_move_count != 0` guard for the search probe).
pub fn probeable(board: &Board, adapter: &dyn TbAdapter) -> bool {
    board.castling_rights == 0 && (board.occupied().count_ones()) <= adapter.largest()
}

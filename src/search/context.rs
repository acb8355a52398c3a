//! Per-thread search state: killer/history tables, the per-ply search
//! stack, and node/seldepth counters (`spec.md` §3 "SearchStackState",
//! §4.10 `SearchLocalState`).
//!
//! `killer_moves`/`history` are the simple butterfly table the original
//! single-threaded driver used for move ordering; they are kept so
//! existing call sites keep working unchanged. The richer per-spec
//! tables (continuation/capture/pawn/threat/correction history) live
//! alongside them and are what `search::search` actually consults once a
//! node has more than one predecessor to condition on.

use crate::board::Piece;
use crate::moves::types::Move;
use crate::search::history::{
    ButterflyHistory, CaptureHistory, ContinuationHistory, CorrectionHistory, PawnHistory,
    ThreatHistory,
};
use crate::search::tb::{NoopTbAdapter, TbAdapter};
use crate::square::Square;
use std::sync::Arc;

pub const MAX_PLY: usize = 128;

/// One recursion depth's worth of search-stack data (`spec.md` §3).
#[derive(Clone, Default)]
pub struct SearchStackEntry {
    pub pv: Vec<Move>,
    pub killers: [Option<Move>; 2],
    /// The move that led to this node, and the piece that made it —
    /// feeds the continuation-history lookup at plies {1,2,4,6}.
    pub moved: Option<(Piece, Square)>,
    pub singular_exclusion: Option<Move>,
    pub multi_extensions: i32,
}

pub struct SearchContext {
    pub killer_moves: Vec<[Option<Move>; 2]>,
    pub history: [[i32; 64]; 64],

    pub butterfly: ButterflyHistory,
    pub continuation: ContinuationHistory,
    pub capture_hist: CaptureHistory,
    pub pawn_hist: PawnHistory,
    pub threat_hist: ThreatHistory,
    pub correction: CorrectionHistory,

    pub stack: Vec<SearchStackEntry>,

    pub nodes: u64,
    pub sel_depth: usize,
    pub tb_hits: u64,

    /// Root moves already reported as an earlier MultiPV line this
    /// iteration (`spec.md` §4.10 "MultiPV setting"); the ply-0 move loop
    /// skips these so the next-best line is found instead of repeating
    /// the previous one.
    pub root_exclude: Vec<Move>,

    /// Syzygy probe adapter (`spec.md` §4.9 step 3); defaults to a no-op
    /// so every search works unconfigured, the way `SyzygyPath` being
    /// unset disables probing entirely.
    pub tb: Arc<dyn TbAdapter>,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchContext {
    pub fn new() -> Self {
        Self {
            killer_moves: vec![[None; 2]; MAX_PLY],
            history: [[0; 64]; 64],
            butterfly: ButterflyHistory::new(),
            continuation: ContinuationHistory::new(),
            capture_hist: CaptureHistory::new(),
            pawn_hist: PawnHistory::new(),
            threat_hist: ThreatHistory::new(),
            correction: CorrectionHistory::new(),
            stack: vec![SearchStackEntry::default(); MAX_PLY],
            nodes: 0,
            sel_depth: 0,
            tb_hits: 0,
            root_exclude: Vec::new(),
            tb: Arc::new(NoopTbAdapter),
        }
    }

    /// Installs a configured Syzygy adapter (`setoption name SyzygyPath`).
    pub fn set_tb_adapter(&mut self, adapter: Arc<dyn TbAdapter>) {
        self.tb = adapter;
    }

    pub fn update_killer(&mut self, ply: usize, mv: Move) {
        if self.killer_moves[ply][0] != Some(mv) {
            self.killer_moves[ply][1] = self.killer_moves[ply][0];
            self.killer_moves[ply][0] = Some(mv);
        }
        self.stack[ply].killers = self.killer_moves[ply];
    }

    pub fn update_history(&mut self, mv: Move, depth: i32) {
        let bonus = (depth * depth).min(400);
        self.history[mv.from.index() as usize][mv.to.index() as usize] += bonus;
    }

    /// Collects the (piece, to) of the moves at plies {1,2,4,6} behind
    /// `ply`, for continuation-history lookups (`spec.md` §3).
    pub fn continuation_predecessors(&self, ply: usize) -> [Option<(Piece, Square)>; 4] {
        let mut out = [None; 4];
        for (i, back) in [1usize, 2, 4, 6].into_iter().enumerate() {
            if ply >= back {
                out[i] = self.stack[ply - back].moved;
            }
        }
        out
    }

    /// Resets per-game-tree-search state without reallocating the heap
    /// tables (`ucinewgame` clears them separately via fresh construction).
    pub fn new_search(&mut self) {
        self.nodes = 0;
        self.sel_depth = 0;
        self.tb_hits = 0;
        for entry in self.stack.iter_mut() {
            entry.pv.clear();
            entry.killers = [None; 2];
            entry.moved = None;
            entry.singular_exclusion = None;
            entry.multi_extensions = 0;
        }
    }
}

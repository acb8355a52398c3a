//! History heuristics: butterfly, continuation, capture, pawn-structure,
//! threat and correction tables (`spec.md` §3 "History tables", §4.9
//! step 9). All tables use the same bounded "history gravity" update so a
//! single bonus/malus never runs away: `e += scale*delta - e*|delta|*scale/max`.

use crate::board::{Board, Color, Piece};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::is_square_attacked;
use crate::moves::types::Move;
use crate::square::Square;

const MAX_HISTORY: i32 = 16384;
const CORR_HISTORY_SIZE: usize = 16384;
const PAWN_HISTORY_SIZE: usize = 4096;

/// Bounded update shared by every history table in this module.
#[inline]
fn update_bounded(entry: &mut i32, delta: i32) {
    let clamped_delta = delta.clamp(-MAX_HISTORY, MAX_HISTORY);
    *entry += clamped_delta - (*entry * clamped_delta.abs()) / MAX_HISTORY;
}

/// `[side][from][to]`, the classic "how often has a quiet move from this
/// square to that square caused a cutoff" table.
pub struct ButterflyHistory {
    table: Box<[[[i32; 64]; 64]; 2]>,
}

impl ButterflyHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[0i32; 64]; 64]; 2]),
        }
    }

    #[inline]
    pub fn get(&self, side: Color, from: Square, to: Square) -> i32 {
        self.table[side as usize][from.index() as usize][to.index() as usize]
    }

    #[inline]
    pub fn update(&mut self, side: Color, from: Square, to: Square, bonus: i32) {
        update_bounded(
            &mut self.table[side as usize][from.index() as usize][to.index() as usize],
            bonus,
        );
    }

    pub fn age(&mut self) {
        for side in self.table.iter_mut() {
            for from in side.iter_mut() {
                for v in from.iter_mut() {
                    *v /= 8;
                }
            }
        }
    }
}

impl Default for ButterflyHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Continuation history indexed by (piece, to-square) of the move being
/// scored, conditioned on the (piece, to-square) of a predecessor move at
/// plies {1,2,4,6} *back*. All four predecessor distances are accumulated
/// through the same physical `[Piece][Square][Piece][Square]` table so a
/// bonus learned from one ply distance benefits the equivalent pattern
/// seen at another ply distance (`spec.md` §3).
pub struct ContinuationHistory {
    table: Box<[[[[i32; 64]; 6]; 64]; 6]>,
}

pub const CONTINUATION_PLIES: [usize; 4] = [1, 2, 4, 6];

impl ContinuationHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[[0i32; 64]; 6]; 64]; 6]),
        }
    }

    #[inline]
    pub fn get(&self, prev_piece: Piece, prev_to: Square, piece: Piece, to: Square) -> i32 {
        self.table[prev_piece as usize][prev_to.index() as usize][piece as usize][to.index() as usize]
    }

    #[inline]
    pub fn update(&mut self, prev_piece: Piece, prev_to: Square, piece: Piece, to: Square, bonus: i32) {
        update_bounded(
            &mut self.table[prev_piece as usize][prev_to.index() as usize][piece as usize]
                [to.index() as usize],
            bonus,
        );
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `[side][moving piece type][to][captured piece type]`.
pub struct CaptureHistory {
    table: Box<[[[[i32; 6]; 64]; 6]; 2]>,
}

impl CaptureHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[[0i32; 6]; 64]; 6]; 2]),
        }
    }

    #[inline]
    pub fn get(&self, side: Color, moving: Piece, to: Square, captured: Piece) -> i32 {
        self.table[side as usize][moving as usize][to.index() as usize][captured as usize]
    }

    #[inline]
    pub fn update(&mut self, side: Color, moving: Piece, to: Square, captured: Piece, bonus: i32) {
        update_bounded(
            &mut self.table[side as usize][moving as usize][to.index() as usize][captured as usize],
            bonus,
        );
    }
}

impl Default for CaptureHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `[side][pawn-hash mod N][piece-type][to]`.
pub struct PawnHistory {
    table: Box<[[[[i32; 64]; 6]; PAWN_HISTORY_SIZE]; 2]>,
}

impl PawnHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[[0i32; 64]; 6]; PAWN_HISTORY_SIZE]; 2]),
        }
    }

    #[inline]
    fn index(pawn_key: u64) -> usize {
        (pawn_key as usize) & (PAWN_HISTORY_SIZE - 1)
    }

    #[inline]
    pub fn get(&self, side: Color, pawn_key: u64, piece: Piece, to: Square) -> i32 {
        self.table[side as usize][Self::index(pawn_key)][piece as usize][to.index() as usize]
    }

    #[inline]
    pub fn update(&mut self, side: Color, pawn_key: u64, piece: Piece, to: Square, bonus: i32) {
        update_bounded(
            &mut self.table[side as usize][Self::index(pawn_key)][piece as usize][to.index() as usize],
            bonus,
        );
    }
}

impl Default for PawnHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `[side][is-target-attacked?][from][to]`.
pub struct ThreatHistory {
    table: Box<[[[[i32; 64]; 64]; 2]; 2]>,
}

impl ThreatHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[[0i32; 64]; 64]; 2]; 2]),
        }
    }

    #[inline]
    pub fn get(&self, side: Color, target_attacked: bool, from: Square, to: Square) -> i32 {
        self.table[side as usize][target_attacked as usize][from.index() as usize][to.index() as usize]
    }

    #[inline]
    pub fn update(&mut self, side: Color, target_attacked: bool, from: Square, to: Square, bonus: i32) {
        update_bounded(
            &mut self.table[side as usize][target_attacked as usize][from.index() as usize]
                [to.index() as usize],
            bonus,
        );
    }
}

impl Default for ThreatHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Pawn- and non-pawn-keyed correction history: a small learned delta
/// added to the static evaluation, per `spec.md` §3/§4.9 step 9.
pub struct CorrectionHistory {
    pawn: Box<[[i32; CORR_HISTORY_SIZE]; 2]>,
    non_pawn: Box<[[i32; CORR_HISTORY_SIZE]; 2]>,
}

/// Correction deltas are scaled down before being added to eval so the
/// bounded table (which tops out at `MAX_HISTORY`) only ever nudges the
/// static score by a few hundred centipawns at most.
const CORRECTION_SCALE: i32 = 256;
const CORRECTION_MAX_DELTA: i32 = 300;

impl CorrectionHistory {
    pub fn new() -> Self {
        Self {
            pawn: Box::new([[0i32; CORR_HISTORY_SIZE]; 2]),
            non_pawn: Box::new([[0i32; CORR_HISTORY_SIZE]; 2]),
        }
    }

    #[inline]
    fn index(key: u64) -> usize {
        (key as usize) & (CORR_HISTORY_SIZE - 1)
    }

    pub fn correction(&self, side: Color, pawn_key: u64, non_pawn_key: u64) -> i32 {
        let p = self.pawn[side as usize][Self::index(pawn_key)];
        let np = self.non_pawn[side as usize][Self::index(non_pawn_key)];
        ((p + np) / CORRECTION_SCALE).clamp(-CORRECTION_MAX_DELTA, CORRECTION_MAX_DELTA)
    }

    pub fn update(&mut self, side: Color, pawn_key: u64, non_pawn_key: u64, error: i32) {
        let bonus = error.clamp(-MAX_HISTORY, MAX_HISTORY);
        update_bounded(&mut self.pawn[side as usize][Self::index(pawn_key)], bonus);
        update_bounded(
            &mut self.non_pawn[side as usize][Self::index(non_pawn_key)],
            bonus,
        );
    }
}

impl Default for CorrectionHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `bonus` (scaled by `depth*depth`) to the cutoff move's
/// quiet-move histories and an equal malus to every quiet move searched
/// before it, matching `spec.md` §4.9 step 9.
#[allow(clippy::too_many_arguments)]
#[allow(clippy::too_many_arguments)]
pub fn update_quiet_histories(
    butterfly: &mut ButterflyHistory,
    continuation: &mut ContinuationHistory,
    pawn_hist: &mut PawnHistory,
    threat: &mut ThreatHistory,
    board: &Board,
    tables: &MagicTables,
    best: Move,
    earlier_quiets: &[Move],
    prev_moves: &[Option<(Piece, Square)>; 4],
    depth: i32,
) {
    let side = board.side_to_move;
    let bonus = (depth * depth).min(MAX_HISTORY);

    let apply = |b: &mut ButterflyHistory,
                 c: &mut ContinuationHistory,
                 ph: &mut PawnHistory,
                 th: &mut ThreatHistory,
                 mv: Move,
                 delta: i32| {
        b.update(side, mv.from, mv.to, delta);
        ph.update(side, board.pawn_key(), mv.piece, mv.to, delta);
        for slot in prev_moves.iter() {
            if let Some((pp, pt)) = slot {
                c.update(*pp, *pt, mv.piece, mv.to, delta);
            }
        }
        let attacked = is_square_attacked(board, mv.from, side.opposite(), tables);
        th.update(side, attacked, mv.from, mv.to, delta);
    };

    apply(butterfly, continuation, pawn_hist, threat, best, bonus);
    for &mv in earlier_quiets {
        apply(butterfly, continuation, pawn_hist, threat, mv, -bonus);
    }
}

/// Sum of all quiet-move ordering histories for `mv`, clamped to a range
/// the picker's score field can hold (`spec.md` §4.7).
#[allow(clippy::too_many_arguments)]
pub fn quiet_ordering_score(
    butterfly: &ButterflyHistory,
    continuation: &ContinuationHistory,
    pawn_hist: &PawnHistory,
    threat: &ThreatHistory,
    board: &Board,
    tables: &MagicTables,
    mv: Move,
    prev_moves: &[Option<(Piece, Square)>; 4],
) -> i32 {
    let side = board.side_to_move;
    let mut score = butterfly.get(side, mv.from, mv.to);
    score += pawn_hist.get(side, board.pawn_key(), mv.piece, mv.to);
    for slot in prev_moves.iter() {
        if let Some((pp, pt)) = slot {
            score += continuation.get(*pp, *pt, mv.piece, mv.to);
        }
    }
    let attacked = is_square_attacked(board, mv.from, side.opposite(), tables);
    score += threat.get(side, attacked, mv.from, mv.to);
    score.clamp(-i16::MAX as i32, i16::MAX as i32)
}

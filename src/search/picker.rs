//! Staged Move Picker for lazy move generation and ordering.
//!
//! This module implements a Just-In-Time staged move picker that generates
//! moves on demand rather than generating all moves upfront. The stages are:
//!
//! HashMove -> GoodCaptures -> Killer1 -> Killer2 -> BadCaptures -> Quiets
//!
//! Bad captures are still searched ahead of quiets: a losing exchange is
//! usually better-ordered than an untried quiet move. If an early move
//! causes a beta cutoff, later moves are never generated.

use crate::board::{Board, Piece};
use crate::moves::execute::is_legal_move;
use crate::moves::magic::MagicTables;
use crate::moves::movegen::{generate_pseudo_legal_captures, generate_pseudo_legal_quiets};
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::history::quiet_ordering_score;
use crate::search::see::SeeExt;
use crate::square::Square;
use arrayvec::ArrayVec;

/// Base offset for capture ordering scores (`spec.md` §4.7 `SCORE_CAPTURE +
/// SEE`). Only relative order within the good/bad capture buckets matters,
/// but the offset keeps the scale legible against quiet-move scores if the
/// two are ever compared directly.
const SCORE_CAPTURE: i32 = 1_000_000;

/// The current stage of move generation/picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerStage {
    HashMove,
    GenerateCaptures,
    GoodCaptures,
    Killer1,
    Killer2,
    GenerateQuiets,
    Quiets,
    BadCaptures,
    Done,
}

/// Staged move picker that generates moves lazily on demand.
pub struct MovePicker {
    stage: PickerStage,

    // Move buffers (stack-allocated)
    good_captures: ArrayVec<Move, 64>,
    bad_captures: ArrayVec<Move, 64>,
    quiets: ArrayVec<Move, 256>,

    // Scores for pick-best selection
    good_capture_scores: ArrayVec<i32, 64>,
    bad_capture_scores: ArrayVec<i32, 64>,
    quiet_scores: ArrayVec<i32, 256>,

    // Buffer indices for pick-best iteration
    good_cap_idx: usize,
    quiet_idx: usize,
    bad_cap_idx: usize,

    // Special moves
    hash_move: Option<Move>,
    killers: [Option<Move>; 2],

    // Mode
    captures_only: bool, // For quiescence search
    skip_quiets: bool,
}

impl MovePicker {
    /// Create a new MovePicker.
    ///
    /// # Arguments
    /// * `hash_move` - The hash move from the transposition table (if any)
    /// * `killers` - Killer moves for this ply
    /// * `captures_only` - If true, skip killers and quiets (for quiescence search)
    pub fn new(hash_move: Option<Move>, killers: [Option<Move>; 2], captures_only: bool) -> Self {
        Self {
            stage: PickerStage::HashMove,
            good_captures: ArrayVec::new(),
            bad_captures: ArrayVec::new(),
            quiets: ArrayVec::new(),
            good_capture_scores: ArrayVec::new(),
            bad_capture_scores: ArrayVec::new(),
            quiet_scores: ArrayVec::new(),
            good_cap_idx: 0,
            quiet_idx: 0,
            bad_cap_idx: 0,
            hash_move,
            killers,
            captures_only,
            skip_quiets: false,
        }
    }

    /// Stop yielding quiet moves for the remainder of this pick (the LMP /
    /// futility-prune fail-safe, `spec.md` §4.7). Captures — good and bad —
    /// are staged ahead of quiets, so this only cuts off moves that
    /// haven't been tried yet.
    pub fn skip_quiets(&mut self) {
        self.skip_quiets = true;
    }

    /// Check if a move is the hash move.
    #[inline]
    fn is_hash_move(&self, mv: Move) -> bool {
        if let Some(hm) = self.hash_move {
            mv.from == hm.from && mv.to == hm.to && mv.promotion == hm.promotion
        } else {
            false
        }
    }

    /// Check if a move is a killer move.
    #[inline]
    fn is_killer(&self, mv: Move) -> bool {
        for killer in &self.killers {
            if let Some(k) = killer
                && mv.from == k.from && mv.to == k.to && mv.promotion == k.promotion {
                    return true;
                }
        }
        false
    }

    /// Check if a move is a duplicate (hash move or killer).
    #[inline]
    fn is_duplicate(&self, mv: Move) -> bool {
        self.is_hash_move(mv) || self.is_killer(mv)
    }

    /// Generate captures and classify them into good (SEE >= 0) and bad
    /// (SEE < 0), scoring each by `SCORE_CAPTURE + SEE` (`spec.md` §4.7)
    /// rather than plain MVV-LVA, so ordering within a bucket reflects the
    /// actual exchange outcome.
    fn generate_and_classify_captures(&mut self, board: &Board, tables: &MagicTables) {
        let mut captures: ArrayVec<Move, 128> = ArrayVec::new();
        generate_pseudo_legal_captures(board, tables, &mut captures);

        for mv in captures {
            // Skip hash move - it was already tried
            if self.is_hash_move(mv) {
                continue;
            }

            let see = board.see(mv, tables);
            let score = SCORE_CAPTURE + see;

            if see >= 0 {
                self.good_captures.push(mv);
                self.good_capture_scores.push(score);
            } else {
                self.bad_captures.push(mv);
                self.bad_capture_scores.push(score);
            }
        }
    }

    /// Generate quiet moves and score them with history heuristic and pawn advancement bonus.
    fn generate_quiets(&mut self, board: &Board, tables: &MagicTables, history: &[[i32; 64]; 64]) {
        use crate::board::{Color, Piece};

        generate_pseudo_legal_quiets(board, tables, &mut self.quiets);

        // Score each quiet move with history + pawn advancement bonus
        for mv in &self.quiets {
            let mut score = history[mv.from.index() as usize][mv.to.index() as usize];

            // Pawn advancement bonus: encourage pushing pawns toward promotion
            if mv.piece == Piece::Pawn {
                let to_rank = mv.to.index() / 8;
                let from_rank = mv.from.index() / 8;

                // Check if pawn is advancing (direction depends on color)
                let is_advancing = match board.side_to_move {
                    Color::White => to_rank > from_rank,
                    Color::Black => to_rank < from_rank,
                };

                if is_advancing {
                    // Bonus for reaching ranks 4/5 (0-indexed: 3, 4)
                    if to_rank == 3 || to_rank == 4 {
                        score += 1000;
                    }
                    // Higher bonus for reaching ranks 6/7 (0-indexed: 5, 6)
                    if to_rank == 5 || to_rank == 6 {
                        score += 2000;
                    }
                }
            }

            self.quiet_scores.push(score);
        }
    }

    /// Pick the best capture from the remaining good captures using selection sort.
    /// Returns None if no captures remain.
    fn pick_best_capture(&mut self) -> Option<Move> {
        if self.good_cap_idx >= self.good_captures.len() {
            return None;
        }

        // Find the best remaining capture
        let mut best_idx = self.good_cap_idx;
        let mut best_score = self.good_capture_scores[best_idx];

        for i in (self.good_cap_idx + 1)..self.good_captures.len() {
            if self.good_capture_scores[i] > best_score {
                best_score = self.good_capture_scores[i];
                best_idx = i;
            }
        }

        // Swap best to current position
        self.good_captures.swap(self.good_cap_idx, best_idx);
        self.good_capture_scores.swap(self.good_cap_idx, best_idx);

        let mv = self.good_captures[self.good_cap_idx];
        self.good_cap_idx += 1;
        Some(mv)
    }

    /// Pick the best (least-bad) remaining bad capture using selection sort.
    /// Returns None if no bad captures remain.
    fn pick_best_bad_capture(&mut self) -> Option<Move> {
        if self.bad_cap_idx >= self.bad_captures.len() {
            return None;
        }

        let mut best_idx = self.bad_cap_idx;
        let mut best_score = self.bad_capture_scores[best_idx];

        for i in (self.bad_cap_idx + 1)..self.bad_captures.len() {
            if self.bad_capture_scores[i] > best_score {
                best_score = self.bad_capture_scores[i];
                best_idx = i;
            }
        }

        self.bad_captures.swap(self.bad_cap_idx, best_idx);
        self.bad_capture_scores.swap(self.bad_cap_idx, best_idx);

        let mv = self.bad_captures[self.bad_cap_idx];
        self.bad_cap_idx += 1;
        Some(mv)
    }

    /// Pick the best quiet from the remaining quiets using selection sort.
    /// Returns None if no quiets remain.
    fn pick_best_quiet(&mut self) -> Option<Move> {
        if self.quiet_idx >= self.quiets.len() {
            return None;
        }

        // Find the best remaining quiet
        let mut best_idx = self.quiet_idx;
        let mut best_score = self.quiet_scores[best_idx];

        for i in (self.quiet_idx + 1)..self.quiets.len() {
            if self.quiet_scores[i] > best_score {
                best_score = self.quiet_scores[i];
                best_idx = i;
            }
        }

        // Swap best to current position
        self.quiets.swap(self.quiet_idx, best_idx);
        self.quiet_scores.swap(self.quiet_idx, best_idx);

        let mv = self.quiets[self.quiet_idx];
        self.quiet_idx += 1;
        Some(mv)
    }

    /// Generate quiet moves and score them with the full history stack
    /// (butterfly, continuation, pawn-structure, threat) rather than the
    /// plain from/to table, for use once a node has a `SearchContext` to
    /// consult (`spec.md` §4.7/§4.9 step 9).
    fn generate_quiets_rich(
        &mut self,
        board: &Board,
        tables: &MagicTables,
        ctx: &SearchContext,
        prev_moves: &[Option<(Piece, Square)>; 4],
    ) {
        generate_pseudo_legal_quiets(board, tables, &mut self.quiets);
        for mv in &self.quiets {
            let score = quiet_ordering_score(
                &ctx.butterfly,
                &ctx.continuation,
                &ctx.pawn_hist,
                &ctx.threat_hist,
                board,
                tables,
                *mv,
                prev_moves,
            );
            self.quiet_scores.push(score);
        }
    }

    /// Same staging as [`MovePicker::next`], but quiet moves are ordered
    /// with the full history stack on a `SearchContext` instead of the
    /// plain from/to table. Used by the main search driver once a node has
    /// a `SearchContext` available; quiescence and tests keep using
    /// [`MovePicker::next`].
    pub fn next_rich(
        &mut self,
        board: &mut Board,
        tables: &MagicTables,
        ctx: &SearchContext,
        prev_moves: &[Option<(Piece, Square)>; 4],
    ) -> Option<Move> {
        let empty_history = [[0i32; 64]; 64];
        self.next_inner(board, tables, &empty_history, Some((ctx, prev_moves)))
    }

    /// Returns the next legal move, or None when exhausted.
    ///
    /// CRITICAL: This is loop-based, NOT recursive, to prevent stack overflow.
    pub fn next(
        &mut self,
        board: &mut Board,
        tables: &MagicTables,
        history: &[[i32; 64]; 64],
    ) -> Option<Move> {
        self.next_inner(board, tables, history, None)
    }

    fn next_inner(
        &mut self,
        board: &mut Board,
        tables: &MagicTables,
        history: &[[i32; 64]; 64],
        rich: Option<(&SearchContext, &[Option<(Piece, Square)>; 4])>,
    ) -> Option<Move> {
        loop {
            match self.stage {
                PickerStage::HashMove => {
                    self.stage = PickerStage::GenerateCaptures;
                    if let Some(hm) = self.hash_move {
                        // Validate hash move is pseudo-legal and legal
                        if is_pseudo_legal(board, hm, tables) && is_legal_move(board, hm, tables) {
                            return Some(hm);
                        }
                    }
                    // continue loop to next stage
                }

                PickerStage::GenerateCaptures => {
                    self.generate_and_classify_captures(board, tables);
                    self.stage = PickerStage::GoodCaptures;
                }

                PickerStage::GoodCaptures => {
                    while let Some(mv) = self.pick_best_capture() {
                        // Skip duplicates (hash move already handled above)
                        if self.is_hash_move(mv) {
                            continue;
                        }
                        if is_legal_move(board, mv, tables) {
                            return Some(mv);
                        }
                    }
                    // All good captures exhausted
                    self.stage = if self.captures_only {
                        PickerStage::BadCaptures // Skip killers/quiets in qsearch
                    } else {
                        PickerStage::Killer1
                    };
                }

                PickerStage::Killer1 => {
                    self.stage = PickerStage::Killer2;
                    if let Some(k1) = self.killers[0] {
                        // Killers are quiet moves - skip if it's a capture or the hash move
                        if !k1.is_capture()
                            && !self.is_hash_move(k1)
                            && is_pseudo_legal(board, k1, tables)
                            && is_legal_move(board, k1, tables)
                        {
                            return Some(k1);
                        }
                    }
                }

                PickerStage::Killer2 => {
                    self.stage = PickerStage::BadCaptures;
                    if let Some(k2) = self.killers[1] {
                        // Skip if capture, hash move, or same as killer 1
                        if !k2.is_capture() && !self.is_hash_move(k2) {
                            // Also check not same as killer 1
                            let is_k1 = if let Some(k1) = self.killers[0] {
                                k2.from == k1.from && k2.to == k1.to && k2.promotion == k1.promotion
                            } else {
                                false
                            };
                            if !is_k1
                                && is_pseudo_legal(board, k2, tables)
                                && is_legal_move(board, k2, tables)
                            {
                                return Some(k2);
                            }
                        }
                    }
                }

                // Bad captures are staged ahead of quiets (`spec.md` §4.7
                // GIVE_BAD_LOUD precedes GEN_QUIET): a losing exchange is
                // still usually a better try than an untried quiet.
                PickerStage::BadCaptures => {
                    while let Some(mv) = self.pick_best_bad_capture() {
                        if self.is_hash_move(mv) {
                            continue;
                        }
                        if is_legal_move(board, mv, tables) {
                            return Some(mv);
                        }
                    }
                    self.stage = if self.captures_only {
                        PickerStage::Done
                    } else {
                        PickerStage::GenerateQuiets
                    };
                }

                PickerStage::GenerateQuiets => {
                    if self.skip_quiets {
                        self.stage = PickerStage::Done;
                        continue;
                    }
                    if let Some((ctx, prev_moves)) = rich {
                        self.generate_quiets_rich(board, tables, ctx, prev_moves);
                    } else {
                        self.generate_quiets(board, tables, history);
                    }
                    self.stage = PickerStage::Quiets;
                }

                PickerStage::Quiets => {
                    if self.skip_quiets {
                        self.stage = PickerStage::Done;
                        continue;
                    }
                    while let Some(mv) = self.pick_best_quiet() {
                        // Skip hash move and killers (already tried)
                        if self.is_duplicate(mv) {
                            continue;
                        }
                        if is_legal_move(board, mv, tables) {
                            return Some(mv);
                        }
                    }
                    self.stage = PickerStage::Done;
                }

                PickerStage::Done => return None,
            }
        }
    }
}

/// Check if a move is pseudo-legal (valid move for the current position).
/// This validates that the move could have been generated by the move generator.
fn is_pseudo_legal(board: &Board, mv: Move, tables: &MagicTables) -> bool {
    use crate::board::{Color, Piece};
    use crate::moves::king::KING_ATTACKS;
    use crate::moves::knight::KNIGHT_ATTACKS;
    use crate::moves::pawn::{BLACK_PAWN_ATTACKS, WHITE_PAWN_ATTACKS};

    let color = board.side_to_move;
    let from_idx = mv.from.index() as usize;
    let to_idx = mv.to.index() as usize;
    let from_bb = 1u64 << from_idx;
    let to_bb = 1u64 << to_idx;

    // Check that the piece exists on the from square
    if board.pieces(mv.piece, color) & from_bb == 0 {
        return false;
    }

    // Check that the destination isn't occupied by a friendly piece.
    // Castling is the one exception: `mv.to` names the mover's own rook
    // (`spec.md` §3), which is necessarily friendly-occupied.
    let friendly = board.occupancy(color);
    if !mv.is_castling() && friendly & to_bb != 0 {
        return false;
    }

    // For captures, check there's an enemy piece (or it's en passant)
    let enemy = board.opponent_occupancy(color);
    if mv.is_capture() && !mv.is_en_passant() && enemy & to_bb == 0 {
        return false;
    }

    // Don't allow capturing the king
    let enemy_king = board.pieces(Piece::King, color.opposite());
    if to_bb & enemy_king != 0 {
        return false;
    }

    // Piece-specific validation
    match mv.piece {
        Piece::Pawn => {
            let pawn_attacks = match color {
                Color::White => WHITE_PAWN_ATTACKS[from_idx],
                Color::Black => BLACK_PAWN_ATTACKS[from_idx],
            };

            if mv.is_en_passant() {
                // En passant must target the EP square and be a pawn attack
                if let Some(ep_sq) = board.en_passant {
                    if to_idx != ep_sq.index() as usize {
                        return false;
                    }
                    if pawn_attacks & to_bb == 0 {
                        return false;
                    }
                } else {
                    return false;
                }
            } else if mv.is_capture() {
                // Normal capture - must be a pawn attack
                if pawn_attacks & to_bb == 0 {
                    return false;
                }
            } else {
                // Pawn push - check direction and blockers
                let empty = !board.occupied();
                let (push_delta, double_rank, double_delta): (i32, u64, i32) = match color {
                    Color::White => (8, 0x0000_0000_0000_FF00, 16),
                    Color::Black => (-8, 0x00FF_0000_0000_0000, -16),
                };

                if mv.is_double_pawn_push() {
                    // Double push from starting rank
                    if from_bb & double_rank == 0 {
                        return false;
                    }
                    let expected_to = (from_idx as i32 + double_delta) as usize;
                    if to_idx != expected_to {
                        return false;
                    }
                    // Check both squares are empty
                    let middle = (from_idx as i32 + push_delta) as usize;
                    if empty & (1u64 << middle) == 0 || empty & to_bb == 0 {
                        return false;
                    }
                } else {
                    // Single push
                    let expected_to = (from_idx as i32 + push_delta) as usize;
                    if to_idx != expected_to {
                        return false;
                    }
                    if empty & to_bb == 0 {
                        return false;
                    }
                }
            }

            // Promotion validation
            if mv.is_promotion() {
                let promo_rank = match color {
                    Color::White => 7,
                    Color::Black => 0,
                };
                if to_idx / 8 != promo_rank {
                    return false;
                }
            }
        }
        Piece::Knight => {
            if KNIGHT_ATTACKS[from_idx] & to_bb == 0 {
                return false;
            }
        }
        Piece::Bishop => {
            let attacks = tables.bishop.get_attacks(from_idx, board.occupied());
            if attacks & to_bb == 0 {
                return false;
            }
        }
        Piece::Rook => {
            let attacks = tables.rook.get_attacks(from_idx, board.occupied());
            if attacks & to_bb == 0 {
                return false;
            }
        }
        Piece::Queen => {
            let attacks = tables.queen_attacks(from_idx, board.occupied());
            if attacks & to_bb == 0 {
                return false;
            }
        }
        Piece::King => {
            if mv.is_castling() {
                use crate::moves::movegen::{
                    castle_required_empty, kingside_right, queenside_right,
                };
                let occ = board.occupied();
                let home_rank = (from_idx as u8 / 8) * 8;
                let (has_right, right_idx, king_to, rook_to) = if mv.is_kingside_castle() {
                    (
                        board.has_kingside_castle(color),
                        kingside_right(color),
                        home_rank + 6,
                        home_rank + 5,
                    )
                } else {
                    (
                        board.has_queenside_castle(color),
                        queenside_right(color),
                        home_rank + 2,
                        home_rank + 3,
                    )
                };
                if !has_right {
                    return false;
                }
                let rook_from = home_rank + board.castling_rook_file[right_idx];
                if rook_from as usize != to_idx {
                    return false;
                }
                let required_empty =
                    castle_required_empty(from_idx as u8, king_to, rook_from, rook_to);
                if occ & required_empty != 0 {
                    return false;
                }
            } else if KING_ATTACKS[from_idx] & to_bb == 0 {
                return false;
            }
        }
    }

    true
}

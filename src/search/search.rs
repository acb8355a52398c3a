use crate::board::Board;
use crate::moves::execute::{make_move_basic, make_null_move, undo_move_basic, undo_null_move};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::eval::static_eval;
use crate::search::history::update_quiet_histories;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{NodeType, TranspositionTable};
use std::time::{Duration, Instant};

const INF: i32 = 32000;
const MATE_SCORE: i32 = 31000;
const MATE_THRESHOLD: i32 = MATE_SCORE - 1000; // 30000 - buffer for mate distance
const MAX_Q_SEARCH_DEPTH: usize = 100;
const DRAW_SCORE: i32 = -50;

// --- Tuning constants, held to the literal formulas the move ordering and
// pruning heuristics were tuned against rather than re-derived ---

// Reverse futility pruning: margin grows linearly with depth.
const RFP_DEPTH_LIMIT: i32 = 8;
const RFP_MARGIN_PER_DEPTH: i32 = 119;

// Null move pruning: base reduction plus a depth term plus an eval-over-beta term.
const NMP_DEPTH_LIMIT: i32 = 4;
const NMP_BASE_REDUCTION: i32 = 4;

// Futility pruning at frontier nodes.
const FP_DEPTH_LIMIT: i32 = 15;
const FP_MARGIN_BASE: i32 = 20;
const FP_MARGIN_PER_DEPTH: i32 = 82;
const FP_HISTORY_THRESHOLD: i32 = 512;

// Late move pruning: once this many quiets have been tried with no
// improvement on alpha, stop generating more.
const LMP_DEPTH_LIMIT: i32 = 6;
const LMP_BASE_MOVES: i32 = 10;
const LMP_MOVE_MULTIPLIER: i32 = 7;

// Late move reductions.
const LMR_MIN_DEPTH: i32 = 2;
const LMR_MIN_MOVES: i32 = 4;

// Singular extensions.
const SE_MIN_DEPTH: i32 = 8;
const SE_MARGIN_PER_DEPTH: i32 = 2;
const MAX_MULTI_EXTENSIONS: i32 = 16;

/// `round(-1.76 + 1.03 * ln(depth) * ln(move_index))`, one less in PV
/// nodes. Depth/move_index below 2 never reduce (ln is non-positive or the
/// move is too early to be "late").
fn lmr_reduction(depth: i32, move_index: i32, is_pv: bool) -> i32 {
    if depth < 1 || move_index < 1 {
        return 0;
    }
    let r = -1.76 + 1.03 * (depth as f64).ln() * (move_index as f64).ln();
    let mut r = r.round() as i32;
    if is_pv {
        r -= 1;
    }
    r.max(0)
}

pub struct TimeManager {
    pub start_time: Instant,
    pub allotted: Option<Duration>,
    pub stop_signal: bool,
    /// The UCI `stop` command / Lazy-SMP sibling-thread abort flag
    /// (`spec.md` §4.10, §7 "Search-abort signal"). Checked alongside the
    /// clock so every recursive call still only has to test one field
    /// (`stop_signal`) near entry.
    external_stop: Option<std::sync::Arc<std::sync::atomic::AtomicBool>>,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
            external_stop: None,
        }
    }

    /// Ties this search to a shared stop flag: any thread (or the UCI
    /// `stop` handler) setting it aborts this search cooperatively on the
    /// next `check_time`.
    pub fn with_external_stop(
        limit: Option<Duration>,
        external_stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
            external_stop: Some(external_stop),
        }
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }

        if let Some(ref flag) = self.external_stop {
            if flag.load(std::sync::atomic::Ordering::Acquire) {
                self.stop_signal = true;
                return;
            }
        }

        if let Some(limit) = self.allotted {
            let elapsed = self.start_time.elapsed();

            // Hard Stop: Abort immediately if we hit the limit
            if elapsed >= limit {
                self.stop_signal = true;
            }
        }
    }

    /// Returns the allocated time limit
    #[inline(always)]
    pub fn allocated_time(&self) -> Option<Duration> {
        self.allotted
    }

    /// Returns elapsed time since search started
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    // SAFETY BRAKE: Prevent Q-search explosions
    if ply > MAX_Q_SEARCH_DEPTH {
        return static_eval(board, tables, alpha, beta);
    }

    ctx.sel_depth = ctx.sel_depth.max(ply);

    let stand_pat = static_eval(board, tables, alpha, beta);

    if stand_pat >= beta {
        return beta;
    }
    if stand_pat >= alpha {
        alpha = stand_pat;
    }

    // Use MovePicker in captures-only mode for quiescence
    let mut picker = MovePicker::new(None, [None, None], true);
    let empty_history = [[0i32; 64]; 64];

    while let Some(mv) = picker.next(board, tables, &empty_history) {
        *nodes += 1;
        ctx.nodes += 1;
        if *nodes & 63 == 0 {
            time.check_time();
        }
        if time.stop_signal {
            return stand_pat;
        }

        let mut captured_value = 0;
        if let Some(piece) = board.piece_type_at(mv.to) {
            captured_value = piece.value();
        }

        // DELTA PRUNING SAFETY
        // Don't prune if it's a promotion (potentially huge value)
        // Don't prune if it's En Passant (captured_value is 0, but it captures a pawn)
        let is_prom = mv.is_promotion();
        let is_ep = mv.is_en_passant();

        // "Blindness" Fix: Only prune standard captures.
        if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        // SEE Pruning: Skip captures that lose material
        // Note: MovePicker already filters bad captures for us, but we keep this
        // for promotions and en passant which bypass SEE classification
        if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }
    alpha
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> (i32, Option<Move>) {
    let is_pv = beta - alpha > 1;

    // Check every 64 nodes instead of every node for tighter control
    if *nodes & 63 == 0 {
        time.check_time();
    }

    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;
    ctx.nodes += 1;
    ctx.sel_depth = ctx.sel_depth.max(ply);

    if ply >= crate::search::context::MAX_PLY {
        return (static_eval(board, tables, alpha, beta), None);
    }

    // Mate distance pruning: a shorter mate can never be improved on, and a
    // position already lost to a faster mate can never be reached.
    if ply > 0 {
        let mate_alpha = (-MATE_SCORE + ply as i32).max(alpha);
        let mate_beta = (MATE_SCORE - ply as i32).min(beta);
        if mate_alpha >= mate_beta {
            return (mate_alpha, None);
        }
    }

    // Repetition & TT probing
    if ply > 0
        && (board.is_repetition() || crate::hash::cuckoo::has_upcoming_repetition(board))
    {
        return (DRAW_SCORE, None);
    }

    let hash = board.zobrist;
    let mut hash_move = None;
    let singular_exclusion = ctx.stack[ply].singular_exclusion;

    let tt_entry = if singular_exclusion.is_none() {
        tt.probe(hash, ply as i32)
    } else {
        None
    };

    if let Some(entry) = tt_entry {
        hash_move = entry.best_move;

        if entry.depth as i32 >= depth && ply > 0 {
            match entry.bound {
                NodeType::Exact => return (entry.score, entry.best_move),
                NodeType::LowerBound if entry.score >= beta => {
                    return (entry.score, entry.best_move);
                }
                NodeType::UpperBound if entry.score <= alpha => {
                    return (entry.score, entry.best_move);
                }
                _ => {}
            }
        }
    }

    // Syzygy probe (`spec.md` §4.9 step 3): skipped entirely by the
    // default no-op adapter (`largest() == 0`), so this is inert unless
    // `SyzygyPath` has installed a real one.
    if ply > 0 && singular_exclusion.is_none() && crate::search::tb::probeable(board, ctx.tb.as_ref()) {
        if let Some(tb_score) = ctx.tb.probe_wdl_search(board, ply as i32) {
            ctx.tb_hits += 1;
            if !is_pv {
                if tb_score <= alpha || tb_score >= beta {
                    return (tb_score, hash_move);
                }
            } else if tb_score > alpha {
                alpha = tb_score;
                if alpha >= beta {
                    return (tb_score, hash_move);
                }
            }
        }
    }

    let in_check_now = in_check(board, board.side_to_move, tables);

    // Check extension: resolves forced sequences and avoids the horizon effect.
    let check_extension = if in_check_now { 1 } else { 0 };

    if depth <= 0 && !in_check_now {
        let score = quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
        return (score, None);
    }

    let static_eval_val = if !in_check_now {
        let raw = static_eval(board, tables, alpha, beta);
        let side = board.side_to_move;
        raw + ctx.correction.correction(side, board.pawn_key(), board.non_pawn_key(side))
    } else {
        0
    };
    ctx.stack[ply].moved = None;

    // Reverse futility pruning: if the static eval already clears beta by a
    // depth-scaled margin, assume a real search would too.
    if depth < RFP_DEPTH_LIMIT && !in_check_now && ply > 0 && singular_exclusion.is_none() {
        let margin = RFP_MARGIN_PER_DEPTH * depth;
        if static_eval_val - margin >= beta {
            return (beta, None);
        }
    }

    // Null move pruning.
    if depth >= NMP_DEPTH_LIMIT
        && !in_check_now
        && !is_pv
        && singular_exclusion.is_none()
        && board.has_major_pieces(board.side_to_move)
        && static_eval_val >= beta
    {
        let r = NMP_BASE_REDUCTION + depth / 6 + ((static_eval_val - beta) / 250).clamp(0, 3);

        let undo = make_null_move(board);
        let (val, _) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - r - 1,
            ply + 1,
            -beta,
            -beta + 1,
            nodes,
            time,
        );
        let score = -val;
        undo_null_move(board, undo);

        if score >= beta && !time.stop_signal && score < MATE_THRESHOLD {
            return (beta, None);
        }
    }

    let prev_moves = ctx.continuation_predecessors(ply);
    let mut picker = MovePicker::new(hash_move, ctx.killer_moves[ply], false);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0;
    let mut quiets_tried: Vec<Move> = Vec::new();

    while let Some(mv) = {
        let ctx_ref: &SearchContext = ctx;
        picker.next_rich(board, tables, ctx_ref, &prev_moves)
    } {
        if Some(mv) == singular_exclusion {
            continue;
        }

        if ply == 0 && ctx.root_exclude.contains(&mv) {
            continue;
        }

        let is_quiet = !mv.is_capture() && !mv.is_promotion();

        // Futility pruning at frontier nodes.
        if depth < FP_DEPTH_LIMIT && !in_check_now && is_quiet && move_count > 0 {
            let margin = FP_MARGIN_BASE + FP_MARGIN_PER_DEPTH * depth;
            let history = ctx.butterfly.get(board.side_to_move, mv.from, mv.to);
            if history < FP_HISTORY_THRESHOLD && static_eval_val + margin <= alpha {
                continue;
            }
        }

        // Late move pruning: stop considering quiets once enough have
        // failed to beat the original alpha.
        if depth < LMP_DEPTH_LIMIT && !in_check_now && is_quiet && alpha == original_alpha {
            let lmp_threshold = LMP_BASE_MOVES + LMP_MOVE_MULTIPLIER * depth;
            if move_count > lmp_threshold as usize {
                break;
            }
        }

        // Singular extensions: if the TT move at sufficient depth is the
        // only move that doesn't fail low against a reduced-margin
        // verification search, it's forced - extend it one more ply.
        let mut extension = check_extension;
        if move_count == 0
            && depth >= SE_MIN_DEPTH
            && singular_exclusion.is_none()
            && Some(mv) == hash_move
            && ply > 0
        {
            if let Some(entry) = tt_entry {
                if entry.depth as i32 >= depth - 3
                    && entry.bound != NodeType::UpperBound
                    && entry.score.abs() < MATE_THRESHOLD
                {
                    let margin = SE_MARGIN_PER_DEPTH * depth;
                    let se_beta = entry.score - margin;
                    ctx.stack[ply].singular_exclusion = Some(mv);
                    let (se_score, _) = alpha_beta(
                        board,
                        tables,
                        ctx,
                        tt,
                        (depth - 1) / 2,
                        ply,
                        se_beta - 1,
                        se_beta,
                        nodes,
                        time,
                    );
                    ctx.stack[ply].singular_exclusion = None;

                    if se_score < se_beta {
                        if !is_pv
                            && se_score < se_beta - 20
                            && ctx.stack[ply - 1].multi_extensions < MAX_MULTI_EXTENSIONS
                        {
                            extension += 1;
                            ctx.stack[ply].multi_extensions =
                                ctx.stack[ply - 1].multi_extensions + 1;
                        }
                        extension += 1;
                    } else if se_beta >= beta {
                        // The TT move isn't singular at all; the
                        // verification search itself fails high, so this
                        // whole node can be pruned.
                        return (se_beta, None);
                    }
                }
            }
        }

        let undo = make_move_basic(board, mv);
        ctx.stack[ply].moved = Some((mv.piece, mv.to));
        let mut score;

        if move_count == 0 {
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + extension,
                ply + 1,
                -beta,
                -alpha,
                nodes,
                time,
            );
            score = -val;
        } else {
            let mut r = 0;
            if depth > LMR_MIN_DEPTH
                && move_count > LMR_MIN_MOVES as usize
                && is_quiet
                && !in_check_now
            {
                r = lmr_reduction(depth, move_count as i32, is_pv);
                let history = ctx.butterfly.get(board.side_to_move, mv.from, mv.to);
                if history > FP_HISTORY_THRESHOLD {
                    r -= 1;
                }
                r = r.clamp(0, depth - 2).max(0);
            }

            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 - r,
                ply + 1,
                -alpha - 1,
                -alpha,
                nodes,
                time,
            );
            score = -val;

            if score > alpha && r > 0 {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    nodes,
                    time,
                );
                score = -val;
            }

            if score > alpha && score < beta {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    nodes,
                    time,
                );
                score = -val;
            }
        }

        undo_move_basic(board, undo);
        move_count += 1;

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);

                // Triangular PV update: this move plus whatever the
                // child node already settled on as its own principal
                // continuation (`spec.md` §3 "current PV line").
                let mut line = Vec::with_capacity(1);
                line.push(mv);
                if ply + 1 < ctx.stack.len() {
                    line.extend(ctx.stack[ply + 1].pv.iter().copied());
                }
                ctx.stack[ply].pv = line;
            }
            if score >= beta {
                tt.save(
                    hash,
                    Some(mv),
                    beta,
                    static_eval_val,
                    depth as u8,
                    NodeType::LowerBound,
                    ply as i32,
                );

                if is_quiet {
                    ctx.update_killer(ply, mv);
                    update_quiet_histories(
                        &mut ctx.butterfly,
                        &mut ctx.continuation,
                        &mut ctx.pawn_hist,
                        &mut ctx.threat_hist,
                        board,
                        tables,
                        mv,
                        &quiets_tried,
                        &prev_moves,
                        depth,
                    );
                    ctx.update_history(mv, (depth * depth).min(400));

                    if !in_check_now {
                        let side = board.side_to_move;
                        let error = (beta - static_eval_val).clamp(-400, 400) * depth;
                        ctx.correction
                            .update(side, board.pawn_key(), board.non_pawn_key(side), error);
                    }
                }

                return (beta, Some(mv));
            }
        }

        if is_quiet {
            quiets_tried.push(mv);
        }
    }

    // No legal moves found - checkmate or stalemate
    if move_count == 0 {
        if singular_exclusion.is_some() {
            // Verification search with no legal alternative: the excluded
            // move is forced, report a fail-low so the caller extends it.
            return (alpha, None);
        }
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    if best_score <= original_alpha && !in_check_now {
        if let Some(bm) = best_move {
            if !bm.is_capture() && !bm.is_promotion() {
                let side = board.side_to_move;
                let error = (best_score - static_eval_val).clamp(-400, 400) * depth;
                ctx.correction
                    .update(side, board.pawn_key(), board.non_pawn_key(side), error);
            }
        }
    }

    let node_type = if best_score >= beta {
        NodeType::LowerBound
    } else if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };

    tt.save(
        hash,
        best_move,
        best_score,
        static_eval_val,
        depth as u8,
        node_type,
        ply as i32,
    );

    (best_score, best_move)
}

/// One completed-depth report handed to the `on_depth` callback threaded
/// through `iterative_deepening` — everything `spec.md` §6's `go` needs
/// to print an `info` line, plus the PV line itself (collected via the
/// triangular update in `alpha_beta`'s move loop).
pub struct DepthReport<'a> {
    pub depth: i32,
    pub seldepth: usize,
    pub score: i32,
    pub nodes: u64,
    pub nps: u128,
    pub hashfull: usize,
    pub time_ms: u128,
    pub tb_hits: u64,
    pub pv: &'a [Move],
}

/// Core iterative-deepening + aspiration-window driver, shared by the
/// single-threaded `search()` entry point and the multi-threaded/MultiPV
/// driver in `search::shared`. `ctx`/`tt`/`time` are caller-owned so a
/// worker thread can supply its own per-thread tables while sharing the
/// transposition table, and `on_depth` decouples reporting from the loop
/// (only the main thread and only the first MultiPV line report to UCI).
#[allow(clippy::too_many_arguments)]
pub fn iterative_deepening(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &TranspositionTable,
    max_depth: i32,
    time: &mut TimeManager,
    mut on_depth: impl FnMut(DepthReport),
) -> (i32, Option<Move>) {
    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0;
    let mut last_iter_duration = Duration::from_millis(0);

    for depth in 1..=max_depth {
        let iter_start = Instant::now();

        // --- ITERATIVE DEEPENING SAFETY CHECK ---
        // Predict if we can afford the next depth before starting it.
        // Conservative estimate: Next depth takes ~3x longer than previous.
        // (Using 3x instead of 2x because branching factor can spike in tactical positions)
        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;

            // If predicting the next depth would push us over the limit: STOP.
            if total_elapsed + predicted_next > limit {
                break;
            }
        }
        // -----------------------------------------

        ctx.new_search();
        for from in 0..64 {
            for to in 0..64 {
                ctx.history[from][to] /= 8;
            }
        }
        ctx.butterfly.age();

        // --- Aspiration Window Logic (spec.md §4.9: delta = 15, exponential
        // widening on failure rather than falling straight back to +-INF) ---
        let mut alpha = -INF;
        let mut beta = INF;
        let mut delta = 15;

        // Only apply aspiration windows at depth > 4 for stability
        if depth > 4 {
            alpha = (last_completed_best_score - delta).max(-INF);
            beta = (last_completed_best_score + delta).min(INF);
        }

        let mut score;
        let mut mv;

        loop {
            // Perform the search with the current window
            let result = alpha_beta(
                board, tables, ctx, tt, depth, 0, alpha, beta, &mut nodes, time,
            );

            score = result.0;
            mv = result.1;

            // If we ran out of time during the search, stop immediately
            if time.stop_signal {
                break;
            }

            // 1. Fail Low (Score <= Alpha): Position is worse than expected.
            // Widen alpha downward by the current delta, then double delta so
            // repeated fail-lows push alpha toward -INF exponentially fast.
            // Keep beta unchanged for stability.
            if score <= alpha {
                alpha = (score - delta).max(-INF);
                delta = delta.saturating_mul(2);
                continue;
            }

            // 2. Fail High (Score >= Beta): Position is better than expected.
            // Widen beta upward the same way. Keep alpha unchanged for stability.
            if score >= beta {
                beta = (score + delta).min(INF);
                delta = delta.saturating_mul(2);
                continue;
            }

            // 3. Success: Score is within the window.
            break;
        }
        // -------------------------------

        // Record duration for the NEXT prediction check
        last_iter_duration = iter_start.elapsed();

        // CRITICAL FIX: If the stop signal was triggered, DO NOT update the best move.
        // The search at this depth is incomplete and likely contains blunders.
        if time.stop_signal {
            break;
        }

        // Only update if the depth actually finished
        last_completed_best_score = score;
        last_completed_best_move = mv;

        // Report this depth to the caller (UCI `info` line construction,
        // MultiPV aggregation, or nothing at all for helper threads).
        if last_completed_best_move.is_some() {
            let elapsed_ms = time.start_time.elapsed().as_millis().max(1);
            let pv: &[Move] = if ctx.stack[0].pv.is_empty() {
                std::slice::from_ref(last_completed_best_move.as_ref().unwrap())
            } else {
                &ctx.stack[0].pv
            };
            on_depth(DepthReport {
                depth,
                seldepth: ctx.sel_depth,
                score: last_completed_best_score,
                nodes,
                nps: (nodes as u128 * 1000) / elapsed_ms,
                hashfull: tt.hashfull(),
                time_ms: elapsed_ms,
                tb_hits: ctx.tb_hits,
                pv,
            });
        }

        // Optimization: If we found a mate, stop searching deeper
        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    (last_completed_best_score, last_completed_best_move)
}

/// Formats a score for UCI's `score cp <n>` / `score mate <n>` field.
pub fn format_uci_score(score: i32) -> String {
    if score.abs() >= MATE_THRESHOLD {
        let moves_to_mate = (MATE_SCORE - score.abs() + 1) / 2;
        if score > 0 {
            format!("mate {}", moves_to_mate)
        } else {
            format!("mate -{}", moves_to_mate)
        }
    } else {
        format!("cp {}", score)
    }
}

/// Single-threaded, single-PV search: the original entry point, now a
/// thin wrapper over `iterative_deepening` that prints the classic `info`
/// line itself so every existing caller keeps working unchanged.
pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    max_depth: i32,
    time_limit: Option<Duration>,
) -> (i32, Option<Move>) {
    tt.new_search();
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::new(time_limit);

    iterative_deepening(board, tables, &mut ctx, tt, max_depth, &mut time, |r| {
        let pv_str = r
            .pv
            .iter()
            .map(|m| m.to_uci(false))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "info depth {} seldepth {} score {} nodes {} nps {} hashfull {} time {} pv {}",
            r.depth,
            r.seldepth,
            format_uci_score(r.score),
            r.nodes,
            r.nps,
            r.hashfull,
            r.time_ms,
            pv_str
        );
    })
}

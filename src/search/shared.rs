//! Thread coordination and MultiPV reporting (`spec.md` §4.10, §5).
//!
//! Grounded on the teacher's single-threaded `iterative_deepening` loop,
//! parallelized the way `examples/menezesd-ChessEngine`'s
//! `board/search/smp.rs` runs Lazy SMP: every worker thread does its own
//! full iterative-deepening search of the same position, sharing one
//! transposition table behind an `Arc` (lock-free per `spec.md` §4.8) and
//! a `stop` flag, while keeping its own `SearchContext` (history/killer
//! tables, search stack) unshared, exactly as the teacher's single-thread
//! path already keeps `SearchContext` thread-local. Best-move/PV
//! reporting is serialized behind one coarse `Mutex`, held only while
//! installing a result, never during the recursive search itself
//! (`spec.md` §5 "Shared-resource policy").

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::board::Board;
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::search::{DepthReport, TimeManager, format_uci_score, iterative_deepening};
use crate::search::tt::TranspositionTable;

/// 32 MiB: singular-extension re-searches and deep check-extension chains
/// can exceed the default 8 MiB thread stack at high depth.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// One MultiPV line's result for a completed depth, reported to the UCI
/// front-end with `multipv <n>` (`spec.md` §6 `go`).
pub struct MultiPvReport {
    pub multipv_index: usize,
    pub depth: i32,
    pub seldepth: usize,
    pub score: i32,
    pub nodes: u64,
    pub nps: u128,
    pub hashfull: usize,
    pub tb_hits: u64,
    pub time_ms: u128,
    pub pv: Vec<Move>,
}

/// Coordination shared by every worker thread across one `go`
/// (`spec.md` §4.10 `SearchSharedState`). Owns the TT, the cooperative
/// stop flag, and the atomics threads fold their local counters into;
/// best-move installation and `highest_completed_depth` advancement
/// happen under `results` together, per the spec's concurrency model.
pub struct SearchSharedState {
    pub tt: Arc<TranspositionTable>,
    pub stop: Arc<AtomicBool>,
    pub total_nodes: Arc<AtomicU64>,
    pub max_seldepth: Arc<AtomicU64>,
    pub highest_completed_depth: Arc<AtomicU64>,
    results: Mutex<Vec<WorkerResult>>,
}

struct WorkerResult {
    depth: i32,
    score: i32,
    pv: Vec<Move>,
}

impl SearchSharedState {
    pub fn new(tt: Arc<TranspositionTable>, stop: Arc<AtomicBool>) -> Self {
        tt.bump_generation();
        Self {
            tt,
            stop,
            total_nodes: Arc::new(AtomicU64::new(0)),
            max_seldepth: Arc::new(AtomicU64::new(0)),
            highest_completed_depth: Arc::new(AtomicU64::new(0)),
            results: Mutex::new(Vec::new()),
        }
    }

    /// Installs a completed depth's result and advances
    /// `highest_completed_depth` so sibling threads still mid-search at
    /// this depth know to abandon it and join at the next one
    /// (`spec.md` §4.10 "Upon completing a depth").
    fn install(&self, depth: i32, score: i32, pv: Vec<Move>) {
        let mut results = self.results.lock().expect("search-results mutex poisoned");
        results.push(WorkerResult { depth, score, pv });
        let mut highest = self.highest_completed_depth.load(Ordering::Relaxed);
        while (depth as u64) > highest {
            match self.highest_completed_depth.compare_exchange_weak(
                highest,
                depth as u64,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(cur) => highest = cur,
            }
        }
    }

    /// The deepest completed result across all workers, preferring the
    /// one actually reaching the greatest depth (ties broken by
    /// insertion order, which favors the main thread since it reports
    /// first at a given depth in the common case).
    fn best(&self) -> Option<(i32, Option<Move>)> {
        let results = self.results.lock().expect("search-results mutex poisoned");
        results
            .iter()
            .max_by_key(|r| r.depth)
            .map(|r| (r.score, r.pv.first().copied()))
    }

    fn update_seldepth(&self, seldepth: usize) {
        let mut current = self.max_seldepth.load(Ordering::Relaxed);
        while seldepth as u64 > current {
            match self.max_seldepth.compare_exchange_weak(
                current,
                seldepth as u64,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(c) => current = c,
            }
        }
    }
}

/// Runs `go`'s search across `num_threads` Lazy-SMP workers (or, for
/// `num_threads == 1`, a single thread inline with no spawn overhead).
/// Only the first thread's completed depths are reported through
/// `on_depth`, matching the teacher's single-PV `info` stream; helper
/// threads search silently to populate the shared TT.
#[allow(clippy::too_many_arguments)]
pub fn search_threaded(
    board: &Board,
    tables: &MagicTables,
    shared: &SearchSharedState,
    num_threads: usize,
    max_depth: i32,
    time_limit: Option<Duration>,
    mut on_depth: impl FnMut(DepthReport) + Send,
) -> (i32, Option<Move>) {
    let num_threads = num_threads.max(1);

    if num_threads == 1 {
        let mut b = board.clone();
        let mut ctx = SearchContext::new();
        let mut time = TimeManager::with_external_stop(time_limit, Arc::clone(&shared.stop));
        let result = iterative_deepening(&mut b, tables, &mut ctx, &shared.tt, max_depth, &mut time, |r| {
            on_depth(r)
        });
        shared.update_seldepth(ctx.sel_depth);
        shared
            .total_nodes
            .fetch_add(ctx.nodes, Ordering::Relaxed);
        return result;
    }

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_threads);

        // Worker 0 is the reporting thread; workers 1.. search silently,
        // searching one ply deeper every other worker to help populate
        // the shared TT ahead of the main thread (`spec.md` §4.10,
        // mirroring the depth-offset trick in the example's lazy-SMP
        // worker scheduling).
        for worker_id in 0..num_threads {
            let board_clone = board.clone();
            let depth_offset = if worker_id > 0 && worker_id % 2 == 1 { 1 } else { 0 };
            let worker_max_depth = (max_depth + depth_offset).max(1);
            let is_main = worker_id == 0;

            let handle = thread::Builder::new()
                .name(format!("halogen-search-{worker_id}"))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn_scoped(scope, {
                    let shared = &*shared;
                    let on_depth = if is_main { Some(&mut on_depth) } else { None };
                    move || run_worker(board_clone, tables, shared, worker_max_depth, time_limit, on_depth)
                })
                .expect("failed to spawn search worker");

            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.join();
        }
    });

    shared.best().unwrap_or((0, None))
}

fn run_worker(
    mut board: Board,
    tables: &MagicTables,
    shared: &SearchSharedState,
    max_depth: i32,
    time_limit: Option<Duration>,
    mut on_depth: Option<&mut (impl FnMut(DepthReport) + Send + ?Sized)>,
) {
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::with_external_stop(time_limit, Arc::clone(&shared.stop));

    let (score, best_move) =
        iterative_deepening(&mut board, tables, &mut ctx, &shared.tt, max_depth, &mut time, |r| {
            shared.install(r.depth, r.score, r.pv.to_vec());
            if let Some(cb) = on_depth.as_deref_mut() {
                cb(r);
            }
        });

    shared.update_seldepth(ctx.sel_depth);
    shared.total_nodes.fetch_add(ctx.nodes, Ordering::Relaxed);

    if best_move.is_none() {
        let _ = score;
    }
}

/// MultiPV driver: runs `multipv` independent root searches per depth,
/// excluding lines already reported this depth so each successive search
/// finds the next-best root move (`spec.md` §4.10 "MultiPV state").
/// Single-threaded; combining MultiPV with Lazy-SMP workers is possible
/// but not implemented here since the teacher's search has no existing
/// per-line thread split to generalize from.
pub fn search_multipv(
    board: &Board,
    tables: &MagicTables,
    tt: &TranspositionTable,
    multipv: usize,
    max_depth: i32,
    time_limit: Option<Duration>,
    stop: Arc<AtomicBool>,
    mut report: impl FnMut(MultiPvReport),
) -> Vec<(i32, Option<Move>)> {
    let multipv = multipv.max(1);
    if multipv == 1 {
        let mut b = board.clone();
        let mut ctx = SearchContext::new();
        let mut time = TimeManager::with_external_stop(time_limit, stop);
        let result = iterative_deepening(&mut b, tables, &mut ctx, tt, max_depth, &mut time, |r| {
            report(MultiPvReport {
                multipv_index: 1,
                depth: r.depth,
                seldepth: r.seldepth,
                score: r.score,
                nodes: r.nodes,
                nps: r.nps,
                hashfull: r.hashfull,
                tb_hits: r.tb_hits,
                time_ms: r.time_ms,
                pv: r.pv.to_vec(),
            });
        });
        return vec![result];
    }

    let mut results = vec![(0, None); multipv];
    let mut ctx = SearchContext::new();
    let mut b = board.clone();
    let mut time = TimeManager::with_external_stop(time_limit, stop);

    for depth in 1..=max_depth {
        // Clears per-ply stack state (PV, killers, singular-exclusion
        // markers) the same way `iterative_deepening` resets it each
        // depth; `root_exclude` is intentionally left to the explicit
        // clear below since it must persist across `pv_index` lines
        // within a depth, not across depths.
        ctx.new_search();
        ctx.root_exclude.clear();
        let mut this_depth = Vec::with_capacity(multipv);

        for pv_index in 0..multipv {
            // One-depth-at-a-time search per PV line: reuse the same
            // SearchContext (history survives across lines, the way a
            // single search naturally accumulates it), excluding moves
            // already claimed by earlier lines at this depth.
            let (score, mv) = crate::search::search::alpha_beta(
                &mut b,
                tables,
                &mut ctx,
                tt,
                depth,
                0,
                -32000,
                32000,
                &mut 0u64,
                &mut time,
            );

            if time.stop_signal {
                break;
            }

            // Snapshot the PV immediately: `ctx.stack[0].pv` is
            // overwritten by the *next* root search in this same loop, so
            // it must be captured here, not after the loop.
            let pv: Vec<Move> = if ctx.stack[0].pv.is_empty() {
                mv.into_iter().collect()
            } else {
                ctx.stack[0].pv.clone()
            };

            if let Some(mv) = mv {
                ctx.root_exclude.push(mv);
            }
            this_depth.push((score, mv, pv));
        }

        if time.stop_signal {
            break;
        }

        for (i, (score, mv, pv)) in this_depth.into_iter().enumerate() {
            results[i] = (score, mv);

            report(MultiPvReport {
                multipv_index: i + 1,
                depth,
                seldepth: ctx.sel_depth,
                score,
                nodes: ctx.nodes,
                nps: (ctx.nodes as u128 * 1000) / time.elapsed().as_millis().max(1),
                hashfull: tt.hashfull(),
                tb_hits: ctx.tb_hits,
                time_ms: time.elapsed().as_millis(),
                pv,
            });
        }

        if let Some((best_score, _)) = results.first() {
            if best_score.abs() >= crate::search::tt::MATE_THRESHOLD {
                break;
            }
        }
    }

    results
}

/// Shorthand used by the CLI for `score cp|mate` formatting, re-exported
/// here so callers only need one `use` for threaded/MultiPV reporting.
pub use format_uci_score as format_score;

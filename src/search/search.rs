use crate::board::Board;
use crate::moves::execute::{make_move_basic, make_null_move, undo_move_basic, undo_null_move};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::eval::static_eval;
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{NodeType, TranspositionTable};
use crate::output::engine_println;
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

pub const INF: i32 = 32000;
pub const MATE_SCORE: i32 = 31000;
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 1000;
const MAX_DEPTH: usize = 64;
const MAX_Q_SEARCH_DEPTH: usize = 100;
const DRAW_SCORE: i32 = 0;
const QUEEN_EG_VALUE: i32 = 936;

// --- Tuning Constants (matched to the staged search's tuning formulas) ---

const RFP_DEPTH_LIMIT: i32 = 4;
const RFP_MARGIN_PER_DEPTH: i32 = 80;

const FP_DEPTH_LIMIT: i32 = 3;
const FP_MOVE_INDEX_THRESHOLD: i32 = 4;
const FP_MARGIN_PER_DEPTH: i32 = 300;

const LMP_MOVE_INDEX_BASE: i32 = 4;
const LMP_MOVE_INDEX_DEPTH_SQ_MULT: i32 = 3;

const LMR_MIN_DEPTH: i32 = 3;
const LMR_MIN_MOVE_INDEX: i32 = 4;

const IIR_MIN_DEPTH: i32 = 8;

// The LMR reduction table, precomputed once: LMR[depth][move_index][is_quiet].
// LMR[d][m][noisy] = floor(0.25 + ln(d)*ln(m) / 3.25)
// LMR[d][m][quiet]  = floor(0.50 + ln(d)*ln(m) / 3.00)
// Zero below d=3 or m=4, matching the staged search's threshold.
static LMR_TABLE: Lazy<Vec<Vec<[i32; 2]>>> = Lazy::new(|| {
    let mut table = vec![vec![[0i32; 2]; MAX_DEPTH + 1]; MAX_DEPTH + 1];
    for d in 3..=MAX_DEPTH {
        for m in 4..=MAX_DEPTH {
            let ln_d = (d as f64).ln();
            let ln_m = (m as f64).ln();
            let noisy = (0.25 + ln_d * ln_m / 3.25).floor() as i32;
            let quiet = (0.50 + ln_d * ln_m / 3.00).floor() as i32;
            table[d][m] = [noisy.max(0), quiet.max(0)];
        }
    }
    table
});

fn lmr_reduction(depth: i32, move_index: i32, is_quiet: bool) -> i32 {
    if depth < LMR_MIN_DEPTH || move_index < LMR_MIN_MOVE_INDEX {
        return 0;
    }
    let d = (depth as usize).min(MAX_DEPTH);
    let m = (move_index as usize).min(MAX_DEPTH);
    LMR_TABLE[d][m][is_quiet as usize]
}

// --- TT score adjustment: stored mate scores are absolute; scores handed
// back up the tree are relative to the current ply. ---
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

pub struct TimeManager {
    pub start_time: Instant,
    pub allotted: Option<Duration>,
    pub stop_signal: bool,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
        }
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }
        if let Some(limit) = self.allotted {
            if self.start_time.elapsed() >= limit {
                self.stop_signal = true;
            }
        }
    }

    #[inline(always)]
    pub fn allocated_time(&self) -> Option<Duration> {
        self.allotted
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[allow(clippy::too_many_arguments)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    if ply > MAX_Q_SEARCH_DEPTH {
        return static_eval(board, tables, alpha, beta);
    }

    let hash = board.zobrist;
    if let Some((_, raw_score, _, tt_bound)) = tt.probe(hash, 0, alpha, beta, ply as i32) {
        let tt_score = score_from_tt(raw_score, ply as i32);
        match tt_bound {
            0 => return tt_score,
            1 if tt_score >= beta => return tt_score,
            2 if tt_score <= alpha => return tt_score,
            _ => {}
        }
    }

    let stand_pat = static_eval(board, tables, alpha, beta);

    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    // Delta pruning: even picking up a queen from here can't reach alpha.
    if stand_pat + QUEEN_EG_VALUE < alpha {
        return alpha;
    }

    let empty_killers = [None, None];
    let empty_history = [[0i32; 64]; 64];
    let mut picker = MovePicker::new(None, empty_killers, true);

    let mut best_score = stand_pat;
    let mut best_move = None;

    while let Some(mv) = picker.next(board, tables, &empty_history) {
        *nodes += 1;
        if *nodes & 63 == 0 {
            time.check_time();
        }
        if time.stop_signal {
            return best_score;
        }

        let mut captured_value = 0;
        if let Some(piece) = board.piece_type_at(mv.to) {
            captured_value = piece.value();
        }

        let is_prom = mv.is_promotion();
        let is_ep = mv.is_en_passant();

        if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
            if score > alpha {
                alpha = score;
            }
        }

        if score >= beta {
            tt.save(
                hash,
                Some(mv),
                score_to_tt(beta, ply as i32),
                0,
                NodeType::LowerBound as u8,
                ply as i32,
            );
            return beta;
        }
    }

    let bound = if best_score > stand_pat {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };
    tt.save(
        hash,
        best_move,
        score_to_tt(best_score, ply as i32),
        0,
        bound as u8,
        ply as i32,
    );

    best_score
}

#[allow(clippy::too_many_arguments)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    do_null: bool,
    pv_node: bool,
    pv: &mut Vec<Move>,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    pv.clear();

    if *nodes & 63 == 0 {
        time.check_time();
    }
    if time.stop_signal {
        return 0;
    }
    *nodes += 1;

    let in_check_now = in_check(board, board.side_to_move, tables);
    let fifty_move_draw = board.halfmove_clock >= 100;

    if ply > 0 {
        // 50-move rule: a side to move that is checkmated right on the
        // clock is still mated, not drawn; everything else is a draw.
        if board.is_repetition() || (fifty_move_draw && !in_check_now) {
            return DRAW_SCORE;
        }
        if ply >= MAX_DEPTH {
            return static_eval(board, tables, alpha, beta);
        }
    }

    let hash = board.zobrist;
    let mut hash_move = None;

    if let Some((tt_move, raw_score, tt_depth, tt_bound)) =
        tt.probe(hash, depth as u8, alpha, beta, ply as i32)
    {
        hash_move = tt_move;

        if tt_depth >= depth.max(0) as u8 && ply > 0 && !fifty_move_draw {
            let tt_score = score_from_tt(raw_score, ply as i32);
            match tt_bound {
                0 => return tt_score,
                1 if tt_score >= beta => return tt_score,
                2 if tt_score <= alpha => return tt_score,
                _ => {}
            }
        }
    }

    let mut depth = if in_check_now { depth + 1 } else { depth };

    if depth <= 0 {
        return quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
    }

    let static_eval_val = if in_check_now {
        0
    } else {
        static_eval(board, tables, alpha, beta)
    };

    if !in_check_now && ply > 0 {
        // Reverse futility pruning.
        if depth <= RFP_DEPTH_LIMIT && static_eval_val >= beta + RFP_MARGIN_PER_DEPTH * depth {
            return static_eval_val;
        }

        // Null-move pruning.
        if do_null && depth >= 3 && board.has_major_pieces(board.side_to_move) {
            let r = 3 + depth / 3;
            let undo = make_null_move(board);
            let mut child_pv = Vec::new();
            let score = -alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - r - 1,
                ply + 1,
                -beta,
                -beta + 1,
                false,
                false,
                &mut child_pv,
                nodes,
                time,
            );
            undo_null_move(board, undo);

            if score >= beta && score.abs() < MATE_THRESHOLD {
                return score;
            }
        }
    }

    // Internal iterative reduction: PV nodes with a lot of depth left and no
    // usable hash move to order from are probably going to re-search anyway.
    if pv_node && depth >= IIR_MIN_DEPTH && !in_check_now && ply > 0 && hash_move.is_none() {
        depth -= 1;
    }

    let mut picker = MovePicker::new(hash_move, ctx.killer_moves[ply], false);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_index = 0;
    let mut child_pv = Vec::new();

    while let Some(mv) = picker.next(board, tables, &ctx.history) {
        let is_quiet = !mv.is_capture() && !mv.is_promotion();
        let is_killer = ctx.killer_moves[ply].contains(&Some(mv));

        // Late-move pruning.
        if !pv_node
            && ply > 0
            && !in_check_now
            && is_quiet
            && !is_killer
            && best_score.abs() < MATE_THRESHOLD
        {
            let threshold = LMP_MOVE_INDEX_BASE + LMP_MOVE_INDEX_DEPTH_SQ_MULT * depth * depth;
            if move_index >= threshold {
                break;
            }
        }

        // Futility pruning.
        if depth <= FP_DEPTH_LIMIT
            && move_index >= FP_MOVE_INDEX_THRESHOLD
            && !in_check_now
            && is_quiet
            && static_eval_val + FP_MARGIN_PER_DEPTH * depth <= alpha
        {
            move_index += 1;
            continue;
        }

        let undo = make_move_basic(board, mv);

        let score = if move_index == 0 {
            -alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1,
                ply + 1,
                -beta,
                -alpha,
                true,
                pv_node,
                &mut child_pv,
                nodes,
                time,
            )
        } else {
            let r = if depth >= LMR_MIN_DEPTH && move_index >= LMR_MIN_MOVE_INDEX {
                lmr_reduction(depth, move_index, is_quiet) + if pv_node { 0 } else { 1 }
            } else {
                0
            };

            let mut s = -alpha_beta(
                board,
                tables,
                ctx,
                tt,
                (depth - 1 - r).max(0),
                ply + 1,
                -alpha - 1,
                -alpha,
                true,
                false,
                &mut child_pv,
                nodes,
                time,
            );

            if s > alpha && r > 0 {
                s = -alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    true,
                    false,
                    &mut child_pv,
                    nodes,
                    time,
                );
            }

            if pv_node && s > alpha && s < beta {
                s = -alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1,
                    ply + 1,
                    -beta,
                    -alpha,
                    true,
                    true,
                    &mut child_pv,
                    nodes,
                    time,
                );
            }

            s
        };

        undo_move_basic(board, undo);
        move_index += 1;

        if time.stop_signal {
            return 0;
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mv);

            if score > alpha {
                alpha = score;
                pv.clear();
                pv.push(mv);
                pv.extend(child_pv.drain(..));
            }

            if score >= beta {
                tt.save(
                    hash,
                    Some(mv),
                    score_to_tt(beta, ply as i32),
                    depth as u8,
                    NodeType::LowerBound as u8,
                    ply as i32,
                );

                if is_quiet {
                    ctx.update_killer(ply, mv);
                    ctx.update_history(mv, depth);
                }

                return beta;
            }
        }
    }

    if move_index == 0 {
        if in_check_now {
            return -MATE_SCORE + ply as i32;
        }
        return 0;
    }

    if time.stop_signal {
        return 0;
    }

    // The clock ran out mid-search without a mate: it's a draw regardless
    // of how good the position looked.
    if ply > 0 && fifty_move_draw {
        pv.clear();
        return DRAW_SCORE;
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
        score_to_tt(best_score, ply as i32),
        depth as u8,
        node_type as u8,
        ply as i32,
    );

    best_score
}

fn format_score(score: i32) -> String {
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

fn pv_to_uci(pv: &[Move]) -> String {
    pv.iter()
        .map(|m| m.to_uci())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Walks the table by repeatedly probing the hash move and making it, used
/// when a depth's search exits without ever building a PV (a root TT cutoff).
fn extract_pv_from_tt(
    board: &mut Board,
    tt: &TranspositionTable,
    tables: &MagicTables,
    max_len: usize,
) -> Vec<Move> {
    let mut pv = Vec::new();
    let mut undo_stack = Vec::new();

    for _ in 0..max_len {
        let probe = tt.probe(board.zobrist, 0, -INF, INF, 0);
        let Some((Some(mv), _, _, _)) = probe else {
            break;
        };
        if !crate::moves::execute::is_legal_move(board, mv, tables) {
            break;
        }
        undo_stack.push(make_move_basic(board, mv));
        pv.push(mv);
    }

    for undo in undo_stack.into_iter().rev() {
        undo_move_basic(board, undo);
    }

    pv
}

pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    ctx: &mut SearchContext,
    max_depth: i32,
    time_limit: Option<Duration>,
) -> (i32, Option<Move>) {
    tt.new_search();
    *ctx = SearchContext::new();

    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0u64;
    let mut time = TimeManager::new(time_limit);
    let mut last_iter_duration = Duration::from_millis(0);
    let mut best_pv: Vec<Move> = Vec::new();

    for depth in 1..=max_depth.max(1) {
        let iter_start = Instant::now();

        if depth > 1 {
            if let Some(limit) = time.allocated_time() {
                let total_elapsed = time.elapsed();
                let predicted_next = last_iter_duration * 3;
                if total_elapsed + predicted_next > limit {
                    break;
                }
            }
        }

        for from in 0..64 {
            for to in 0..64 {
                ctx.history[from][to] /= 8;
            }
        }

        let mut pv = Vec::new();
        let score;

        if depth <= 3 {
            score = alpha_beta(
                board, tables, ctx, tt, depth, 0, -INF, INF, true, true, &mut pv, &mut nodes,
                &mut time,
            );
        } else {
            // Aspiration windows: progressively widen on fail-low/fail-high.
            let mut delta = 33;
            let mut alpha = (last_completed_best_score - delta).max(-INF);
            let mut beta = (last_completed_best_score + delta).min(INF);
            let mut result;

            loop {
                result = alpha_beta(
                    board, tables, ctx, tt, depth, 0, alpha, beta, true, true, &mut pv,
                    &mut nodes, &mut time,
                );

                if time.stop_signal {
                    break;
                }

                if result <= alpha {
                    beta = (alpha + beta) / 2;
                    alpha = (alpha - delta).max(-INF);
                    delta += delta / 2;
                } else if result >= beta {
                    beta = (beta + delta).min(INF);
                    delta += delta / 2;
                } else {
                    break;
                }
            }

            score = result;
        }

        last_iter_duration = iter_start.elapsed();

        if time.stop_signal && depth > 1 {
            break;
        }

        last_completed_best_score = score;

        if nodes == 0 || pv.is_empty() {
            pv = extract_pv_from_tt(board, tt, tables, depth as usize);
        }

        last_completed_best_move = pv.first().copied().or(last_completed_best_move);
        if !pv.is_empty() {
            best_pv = pv;
        }

        if let Some(valid_mv) = last_completed_best_move {
            let elapsed_ms = time.start_time.elapsed().as_millis().max(1);
            let nps = (nodes as u128 * 1000) / elapsed_ms;

            let pv_str = if best_pv.is_empty() {
                valid_mv.to_uci()
            } else {
                pv_to_uci(&best_pv)
            };

            engine_println!(
                "info depth {} seldepth {} score {} nodes {} nps {} hashfull {} time {} pv {}",
                depth,
                depth,
                format_score(last_completed_best_score),
                nodes,
                nps,
                tt.hashfull(),
                elapsed_ms,
                pv_str
            );
        }

        if last_completed_best_score.abs() >= MATE_THRESHOLD {
            let mate_in = (MATE_SCORE - last_completed_best_score.abs() + 1) / 2;
            if depth > mate_in + 1 {
                break;
            }
        }
    }

    engine_println!(
        "bestmove {}",
        last_completed_best_move
            .map(|m| m.to_uci())
            .unwrap_or_else(|| "0000".to_string())
    );

    (last_completed_best_score, last_completed_best_move)
}

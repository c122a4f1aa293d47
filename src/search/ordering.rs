use crate::board::{Board, Piece};
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;

const PROMOTION_QUEEN_SCORE: i32 = 5_000_000;
const CAPTURE_BASE: i32 = 2_000_000;
const CASTLE_SCORE: i32 = 750_000;
const PROMOTION_KNIGHT_SCORE: i32 = 300_000;
const PROMOTION_ROOK_SCORE: i32 = 200_000;
const PROMOTION_BISHOP_SCORE: i32 = 100_000;
const QUIET_PAWN_PUSH_SCORE: i32 = 50_000;

const HASH_MOVE_BONUS: i32 = 10_000_000;
const KILLER0_SCORE: i32 = 950_000;
const KILLER1_SCORE: i32 = 900_000;

pub fn mvv_lva_score(mv: Move, board: &Board) -> i32 {
    if !mv.is_capture() {
        return 0;
    }

    if let Some(captured) = board.piece_at(mv.to) {
        let captured_piece = captured.1;
        return captured_piece.value() * 10 - mv.piece.attacker_value();
    }

    // En Passant capture: Destination is empty, but it IS a capture.
    // Captured piece is a Pawn (value 100). Attacker is a Pawn (value 1).
    if mv.is_en_passant() {
        return 100 * 10 - 1; // 999
    }

    0
}

/// Generation-time class score. A move's class is its first match in
/// this order: queen promotion, capture (MVV-LVA, including capturing
/// underpromotions and en passant), castling, underpromotion tier,
/// quiet pawn push, everything else.
fn generation_score(mv: Move, board: &Board) -> i32 {
    if mv.promotion == Some(Piece::Queen) {
        return PROMOTION_QUEEN_SCORE;
    }

    if mv.is_capture() {
        return CAPTURE_BASE + mvv_lva_score(mv, board);
    }

    if let Some(p) = mv.promotion {
        return match p {
            Piece::Knight => PROMOTION_KNIGHT_SCORE,
            Piece::Rook => PROMOTION_ROOK_SCORE,
            Piece::Bishop => PROMOTION_BISHOP_SCORE,
            _ => 0,
        };
    }

    if mv.is_castling() {
        return CASTLE_SCORE;
    }

    if mv.piece == Piece::Pawn {
        return QUIET_PAWN_PUSH_SCORE;
    }

    0
}

pub fn order_moves(
    moves: &mut [Move],
    board: &Board,
    killer_moves: &[Option<Move>; 2],
    history: &[[i32; 64]; 64],
    hash_move: Option<Move>,
    _tables: &MagicTables,
) {
    // stable sort so equal-score moves keep their generation order
    moves.sort_by_cached_key(|&mv| {
        let mut score = generation_score(mv, board);

        let is_hash_move = hash_move
            .is_some_and(|hm| mv.from == hm.from && mv.to == hm.to && mv.promotion == hm.promotion);

        if is_hash_move {
            score += HASH_MOVE_BONUS;
        } else if killer_moves[0]
            .is_some_and(|k| mv.from == k.from && mv.to == k.to && mv.promotion == k.promotion)
        {
            score += KILLER0_SCORE;
        } else if killer_moves[1]
            .is_some_and(|k| mv.from == k.from && mv.to == k.to && mv.promotion == k.promotion)
        {
            score += KILLER1_SCORE;
        } else {
            score += history[mv.from.index() as usize][mv.to.index() as usize];
        }

        -score
    });
}

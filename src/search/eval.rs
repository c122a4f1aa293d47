use crate::bitboard::bits_between_squares;
use crate::board::{Board, Color, Piece};
use crate::moves::magic::MagicTables;
use crate::search::pesto;
use crate::search::search::MATE_THRESHOLD;
use crate::square::Square;
use crate::utils::pop_lsb;

const ISOLATED_PAWN_PENALTY: i32 = -15;
const BACKWARDS_PAWN_PENALTY: i32 = -12;
const DOUBLED_PAWN_PENALTY: i32 = -5; // per extra pawn stacked on a file
const CONNECTED_PASSERS_BONUS: i32 = 50;
const LAZY_EVAL_MARGIN: i32 = 200;

// [NEW] Feature constants
const KING_SHIELD_BONUS: i32 = 20; // Bonus for having a pawn shield
const KING_OPEN_FILE_PENALTY: i32 = -30; // Penalty for standing on an open file

const BISHOP_PAIR_BONUS: i32 = 20;
const BISHOP_BLOCKED_CENTRAL_PAWN_PENALTY: i32 = -20;
const BISHOP_ATTACKED_PIECE_BONUS: i32 = 5;
const BISHOP_QUEEN_BATTERY_BONUS: i32 = 10;

const ROOK_OPEN_FILE_BONUS: i32 = 10;
const ROOK_SEMI_OPEN_FILE_BONUS: i32 = 5;
const ROOK_ATTACKED_PIECE_BONUS: i32 = 5;
const ROOK_QUEEN_BATTERY_BONUS: i32 = 10;
const ROOK_STACKED_BONUS: i32 = 10;

const QUEEN_OPEN_FILE_BONUS: i32 = 5;
const QUEEN_SEMI_OPEN_FILE_BONUS: i32 = 3;
const QUEEN_ATTACKED_PIECE_BONUS: i32 = 3;

const TEMPO_WHITE_BONUS: i32 = 20;
const TEMPO_DEVELOPED_WEIGHT: i32 = 8;

// Passed pawn bonus by rank (index 0 = rank 1, index 7 = rank 8)
// Higher bonus for pawns closer to promotion
// TUNED: Increased 6th/7th rank bonuses significantly based on Crafty match analysis
// A pawn on 7th rank is often worth more than a minor piece
const PASSED_PAWN_BONUS: [i32; 8] = [0, 5, 10, 20, 35, 60, 100, 200];

// Phase Weights
const KNIGHT_PHASE: i32 = 3;
const BISHOP_PHASE: i32 = 3;
const ROOK_PHASE: i32 = 5;
const QUEEN_PHASE: i32 = 10;
const TOTAL_PHASE: i32 = 64;

/// Per-piece-type mobility table, (mg, eg) indexed by attacked-square count.
/// Knights top out at 8 destinations, bishops at 13, rooks at 14, queens at 27.
const KNIGHT_MOBILITY: [(i32, i32); 9] = [
    (-20, -20),
    (-10, -10),
    (0, 0),
    (5, 5),
    (10, 10),
    (14, 14),
    (18, 16),
    (22, 18),
    (26, 20),
];
const BISHOP_MOBILITY: [(i32, i32); 14] = [
    (-20, -25),
    (-10, -15),
    (0, -5),
    (5, 2),
    (10, 8),
    (15, 12),
    (18, 15),
    (21, 17),
    (24, 19),
    (26, 20),
    (27, 21),
    (28, 22),
    (29, 22),
    (30, 23),
];
const ROOK_MOBILITY: [(i32, i32); 15] = [
    (-15, -25),
    (-8, -15),
    (0, -5),
    (4, 2),
    (8, 8),
    (11, 14),
    (14, 20),
    (16, 26),
    (18, 30),
    (20, 34),
    (21, 36),
    (22, 38),
    (23, 40),
    (24, 41),
    (25, 42),
];
const QUEEN_MOBILITY: [(i32, i32); 28] = [
    (-10, -15),
    (-6, -10),
    (-2, -5),
    (0, 0),
    (2, 3),
    (4, 6),
    (6, 9),
    (8, 11),
    (9, 13),
    (10, 15),
    (11, 16),
    (12, 17),
    (13, 18),
    (13, 18),
    (14, 19),
    (14, 19),
    (15, 20),
    (15, 20),
    (15, 20),
    (15, 20),
    (16, 20),
    (16, 20),
    (16, 20),
    (16, 20),
    (16, 20),
    (16, 20),
    (16, 20),
    (16, 20),
];

#[inline(always)]
fn taper(pair: (i32, i32), phase: i32) -> i32 {
    (pair.0 * phase + pair.1 * (TOTAL_PHASE - phase)) / TOTAL_PHASE
}

// --- Helper: Bitboard Iteration ---
// Iterates through squares in a bitboard (Least Significant Bit first)
struct BitIter(u64);
impl Iterator for BitIter {
    type Item = usize;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            None
        } else {
            let lsb = self.0.trailing_zeros();
            self.0 &= self.0 - 1; // Clear LSB
            Some(lsb as usize)
        }
    }
}

fn calculate_phase(board: &Board) -> i32 {
    let knights = board.pieces(Piece::Knight, Color::White).count_ones()
        + board.pieces(Piece::Knight, Color::Black).count_ones();
    let bishops = board.pieces(Piece::Bishop, Color::White).count_ones()
        + board.pieces(Piece::Bishop, Color::Black).count_ones();
    let rooks = board.pieces(Piece::Rook, Color::White).count_ones()
        + board.pieces(Piece::Rook, Color::Black).count_ones();
    let queens = board.pieces(Piece::Queen, Color::White).count_ones()
        + board.pieces(Piece::Queen, Color::Black).count_ones();

    let current_phase_material = (knights as i32 * KNIGHT_PHASE)
        + (bishops as i32 * BISHOP_PHASE)
        + (rooks as i32 * ROOK_PHASE)
        + (queens as i32 * QUEEN_PHASE);

    current_phase_material.clamp(0, TOTAL_PHASE)
}

#[inline(always)]
pub fn mirror_vert(sq: u8) -> usize {
    (sq ^ 56) as usize
}

// Helper: Map piece to tables from pesto.rs
fn get_psqt(kind: Piece) -> (&'static [i32; 64], &'static [i32; 64]) {
    match kind {
        Piece::Pawn => (&pesto::PAWN_TABLE.0, &pesto::PAWN_TABLE.1),
        Piece::Knight => (&pesto::KNIGHT_TABLE.0, &pesto::KNIGHT_TABLE.1),
        Piece::Bishop => (&pesto::BISHOP_TABLE.0, &pesto::BISHOP_TABLE.1),
        Piece::Rook => (&pesto::ROOK_TABLE.0, &pesto::ROOK_TABLE.1),
        Piece::Queen => (&pesto::QUEEN_TABLE.0, &pesto::QUEEN_TABLE.1),
        Piece::King => (&pesto::KING_TABLE.0, &pesto::KING_TABLE.1),
    }
}

// Helper: Map piece to material values
fn get_piece_value(kind: Piece) -> (i32, i32) {
    match kind {
        Piece::Pawn => pesto::PAWN_VAL,
        Piece::Knight => pesto::KNIGHT_VAL,
        Piece::Bishop => pesto::BISHOP_VAL,
        Piece::Rook => pesto::ROOK_VAL,
        Piece::Queen => pesto::QUEEN_VAL,
        Piece::King => pesto::KING_VAL,
    }
}

pub fn static_eval(board: &Board, tables: &MagicTables, alpha: i32, beta: i32) -> i32 {
    let side = board.side_to_move;
    let enemy = side.opposite();

    // 0. Dead-drawn material (kings plus at most one knight per side) overrides
    // everything else, including the lazy cutoffs below, since those cutoffs
    // work off the raw material score and would otherwise report a "winning"
    // position for the side holding the lone knight.
    if is_knight_draw_material(board) {
        return draw_noise_score(board);
    }

    // 1. Perspective Base Score
    let color_multiplier = if side == Color::White { 1 } else { -1 };
    let mut score = pesto_eval(board) * color_multiplier;

    // 2. Lazy Cutoffs
    if score - LAZY_EVAL_MARGIN >= beta {
        return score;
    }
    if score + LAZY_EVAL_MARGIN <= alpha {
        return score;
    }

    // 3. Positional Terms
    let phase = calculate_phase(board);
    score += eval_mobility(board, tables, side, phase) - eval_mobility(board, tables, enemy, phase);

    // [MODIFIED] Uses updated evaluate_pawn_structure with blocked logic
    score += evaluate_pawn_structure(board) * color_multiplier;

    // 4. Phased King Safety (Attacks)
    // Subtracting enemy attacks on our king, adding our attacks on theirs.
    score += calculate_phased_safety(board, side, tables)
        - calculate_phased_safety(board, enemy, tables);

    // [NEW] 5. King Shield Safety (Passive)
    score += evaluate_king_shield(board, side) - evaluate_king_shield(board, enemy);

    // 6. Piece-specific activity bonuses (bishops, rooks, queens)
    score += (evaluate_bishops(board, tables, side) - evaluate_bishops(board, tables, enemy))
        * color_multiplier;
    score += (evaluate_rooks(board, tables, side) - evaluate_rooks(board, tables, enemy))
        * color_multiplier;
    score += (evaluate_queens(board, tables, side) - evaluate_queens(board, tables, enemy))
        * color_multiplier;

    // 7. Tempo
    score += evaluate_tempo(board) * color_multiplier;

    // 8. Endgame adjustment: scale the score down as the position nears the
    // fifty-move mark, unless it is already at mate range.
    if score.abs() < MATE_THRESHOLD {
        let scale = (100 - board.halfmove_clock as i32).max(0);
        score = score * scale / 100;
    }

    score
}

/// True when the only pieces left are kings plus at most one knight per side
/// (including KN vs KN) — engine-theoretic dead draws that real material
/// scoring would otherwise report as a material-ahead win.
fn is_knight_draw_material(board: &Board) -> bool {
    let pawns = board.pieces(Piece::Pawn, Color::White) | board.pieces(Piece::Pawn, Color::Black);
    let bishops =
        board.pieces(Piece::Bishop, Color::White) | board.pieces(Piece::Bishop, Color::Black);
    let rooks = board.pieces(Piece::Rook, Color::White) | board.pieces(Piece::Rook, Color::Black);
    let queens =
        board.pieces(Piece::Queen, Color::White) | board.pieces(Piece::Queen, Color::Black);
    if (pawns | bishops | rooks | queens) != 0 {
        return false;
    }

    board.pieces(Piece::Knight, Color::White).count_ones() <= 1
        && board.pieces(Piece::Knight, Color::Black).count_ones() <= 1
}

/// Small deterministic draw score in [-3, 3], seeded by the position's own
/// Zobrist hash so it mirrors deterministically across color-flipped positions.
fn draw_noise_score(board: &Board) -> i32 {
    (board.zobrist % 7) as i32 - 3
}

fn evaluate_bishops(board: &Board, tables: &MagicTables, color: Color) -> i32 {
    let bishops = board.pieces(Piece::Bishop, color);
    let mut score = 0;

    if bishops.count_ones() >= 2 {
        score += BISHOP_PAIR_BONUS;
    }

    let own_pawns = board.pieces(Piece::Pawn, color);
    let enemy_occ = board.opponent_occupancy(color);
    let own_occ = board.occupancy(color);
    let occupied = own_occ | enemy_occ;
    let queens = board.pieces(Piece::Queen, color);

    // A bishop "blocks" a central pawn when it sits one square in front of it.
    let forward_block = if color == Color::White {
        own_pawns >> 8
    } else {
        own_pawns << 8
    };
    let central_files = FILE_A << 3 | FILE_A << 4; // d and e files

    let mut iter = bishops;
    while iter != 0 {
        let sq = pop_lsb(&mut iter) as usize;
        if (forward_block & central_files & (1u64 << sq)) != 0 {
            score += BISHOP_BLOCKED_CENTRAL_PAWN_PENALTY;
        }

        let attacks = tables.bishop.get_attacks(sq, occupied);
        score += (attacks & enemy_occ).count_ones() as i32 * BISHOP_ATTACKED_PIECE_BONUS;

        if (attacks & queens) != 0 {
            score += BISHOP_QUEEN_BATTERY_BONUS;
        }
    }

    score
}

fn evaluate_rooks(board: &Board, tables: &MagicTables, color: Color) -> i32 {
    let rooks = board.pieces(Piece::Rook, color);
    if rooks == 0 {
        return 0;
    }

    let own_pawns = board.pieces(Piece::Pawn, color);
    let enemy_pawns = board.pieces(Piece::Pawn, color.opposite());
    let enemy_occ = board.opponent_occupancy(color);
    let occupied = board.occupancy(color) | enemy_occ;
    let queens = board.pieces(Piece::Queen, color);

    let mut score = 0;

    for file in 0..8u32 {
        let file_mask = FILE_A << file;
        let rooks_on_file = rooks & file_mask;
        let count = rooks_on_file.count_ones() as i32;
        if count == 0 {
            continue;
        }

        if (own_pawns & file_mask) == 0 {
            if (enemy_pawns & file_mask) == 0 {
                score += ROOK_OPEN_FILE_BONUS * count;
            } else {
                score += ROOK_SEMI_OPEN_FILE_BONUS * count;
            }
        }

        if count >= 2 {
            score += ROOK_STACKED_BONUS * (count - 1);
        }
    }

    let mut iter = rooks;
    while iter != 0 {
        let sq = pop_lsb(&mut iter) as usize;
        let attacks = tables.rook.get_attacks(sq, occupied);
        score += (attacks & enemy_occ).count_ones() as i32 * ROOK_ATTACKED_PIECE_BONUS;
        if (attacks & queens) != 0 {
            score += ROOK_QUEEN_BATTERY_BONUS;
        }
    }

    score
}

fn evaluate_queens(board: &Board, tables: &MagicTables, color: Color) -> i32 {
    let queens = board.pieces(Piece::Queen, color);
    if queens == 0 {
        return 0;
    }

    let own_pawns = board.pieces(Piece::Pawn, color);
    let enemy_pawns = board.pieces(Piece::Pawn, color.opposite());
    let enemy_occ = board.opponent_occupancy(color);
    let occupied = board.occupancy(color) | enemy_occ;

    let mut score = 0;
    let mut iter = queens;
    while iter != 0 {
        let sq = pop_lsb(&mut iter) as usize;
        let file = sq % 8;
        let file_mask = FILE_A << file;

        if (own_pawns & file_mask) == 0 {
            if (enemy_pawns & file_mask) == 0 {
                score += QUEEN_OPEN_FILE_BONUS;
            } else {
                score += QUEEN_SEMI_OPEN_FILE_BONUS;
            }
        }

        let attacks = tables.bishop.get_attacks(sq, occupied) | tables.rook.get_attacks(sq, occupied);
        score += (attacks & enemy_occ).count_ones() as i32 * QUEEN_ATTACKED_PIECE_BONUS;
    }

    score
}

/// Counts developed minor/major pieces for the tempo term: knights, bishops
/// and the queen off the back rank, rooks off their starting squares, and
/// d/e-pawns off their starting squares.
fn count_developed(board: &Board, color: Color) -> i32 {
    let back_rank_mask = if color == Color::White {
        RANK_1
    } else {
        RANK_8
    };

    let mut developed = 0;
    for piece in [Piece::Knight, Piece::Bishop, Piece::Queen] {
        developed += (board.pieces(piece, color) & !back_rank_mask).count_ones() as i32;
    }

    let rook_start = if color == Color::White {
        (1u64 << 56) | (1u64 << 63)
    } else {
        (1u64 << 0) | (1u64 << 7)
    };
    developed += (board.pieces(Piece::Rook, color) & !rook_start).count_ones() as i32;

    let pawn_start = if color == Color::White {
        bits_between_squares(Square::from_index(51), Square::from_index(52)) // d2, e2
    } else {
        bits_between_squares(Square::from_index(11), Square::from_index(12)) // d7, e7
    };
    let central_pawns = board.pieces(Piece::Pawn, color) & ((FILE_A << 3) | (FILE_A << 4));
    developed += (central_pawns & !pawn_start).count_ones() as i32;

    developed
}

fn evaluate_tempo(board: &Board) -> i32 {
    let mut total_non_pawn = 0u32;
    for piece in [
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ] {
        total_non_pawn += board.pieces(piece, Color::White).count_ones();
        total_non_pawn += board.pieces(piece, Color::Black).count_ones();
    }
    let var_phase = (total_non_pawn as i32 / 16).min(16);

    let net_developed = count_developed(board, Color::White) - count_developed(board, Color::Black);
    let base = TEMPO_WHITE_BONUS + TEMPO_DEVELOPED_WEIGHT * net_developed;

    (base * var_phase) / 16
}

// [NEW] Calculates bonus for friendly pawns in front of the King
fn evaluate_king_shield(board: &Board, color: Color) -> i32 {
    let king_sq_mask = board.pieces(Piece::King, color);
    if king_sq_mask == 0 {
        return 0;
    }

    let king_sq = king_sq_mask.trailing_zeros() as usize;
    let mut score = 0;

    // Row 0 is rank 8, so White's shield sits one row closer to row 0.
    let shield_rank = if color == Color::White {
        king_sq / 8 - 1
    } else {
        king_sq / 8 + 1
    };

    // Avoid checking off-board (rank 8 or -1 equivalent)
    if shield_rank < 8 {
        let king_file = king_sq % 8;
        let us_pawns = board.pieces(Piece::Pawn, color);

        // Check file, left file, right file, being careful with edges
        let min_file = king_file.saturating_sub(1);
        let max_file = (king_file + 1).min(7);

        let mut shield_count = 0;
        for f in min_file..=max_file {
            let shield_sq = shield_rank * 8 + f;
            if (us_pawns & (1 << shield_sq)) != 0 {
                shield_count += 1;
            }
        }

        score += shield_count * KING_SHIELD_BONUS;

        // Penalty for ZERO shield on an open file
        if shield_count == 0 {
            score += KING_OPEN_FILE_PENALTY;
        }
    }
    score
}

/// Attack-unit weight per attacking piece type, keyed by `Piece as usize`
/// (Knight=1 .. Queen=4). Heavier pieces contribute disproportionately more
/// to the king-danger score that indexes `KING_SAFETY_TABLE`.
const KING_ATTACK_UNITS: [i32; 5] = [0, 2, 2, 3, 5];

const KING_SAFETY_TABLE: [i32; 100] = build_king_safety_table();

const fn build_king_safety_table() -> [i32; 100] {
    let mut table = [0i32; 100];
    let mut units = 0;
    while units < 100 {
        let raw = (units * units) / 4;
        table[units] = if raw > 500 { 500 } else { raw as i32 };
        units += 1;
    }
    table
}

fn calculate_phased_safety(board: &Board, color: Color, tables: &MagicTables) -> i32 {
    let enemy = color.opposite();
    let phase = calculate_phase(board); // TOTAL_PHASE = MG, 0 = EG

    let units = count_king_zone_attack_units(board, enemy, color, tables);
    if units == 0 {
        return 0;
    }

    let danger = KING_SAFETY_TABLE[units.min(99) as usize];

    // Tapering logic: Penalty is 100% at full phase, 0% at phase 0.
    let penalty = (danger * phase) / TOTAL_PHASE;

    -penalty // Return as negative value (a penalty)
}

/// Sums attack-unit weighted squares of the king's zone hit by each enemy
/// piece, mirroring a virtual-queen danger zone around the king.
fn count_king_zone_attack_units(
    board: &Board,
    attacker_color: Color,
    victim_color: Color,
    tables: &MagicTables,
) -> i32 {
    let king_sq = board.king_square(victim_color);

    // Create a 3x3 bitboard zone around the king
    let b = 1u64 << king_sq.index();
    let mut king_zone = b | ((b << 1) & 0xFEFEFEFEFEFEFEFE) | ((b >> 1) & 0x7F7F7F7F7F7F7F7F);
    king_zone |= (king_zone << 8) | (king_zone >> 8);

    let mut total_units = 0;

    // Get total occupancy bitboard
    let mut all_pieces = 0u64;
    for p in [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ] {
        all_pieces |= board.pieces(p, Color::White) | board.pieces(p, Color::Black);
    }

    // Iterate through all attacker piece types
    for piece_type in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
        let mut attackers = board.pieces(piece_type, attacker_color);

        while attackers != 0 {
            let from_idx = pop_lsb(&mut attackers);
            let from_sq = Square::from_index(from_idx);

            let zone_attacks = match piece_type {
                Piece::Knight => {
                    crate::moves::magic::get_knight_attacks(from_sq.index() as usize) & king_zone
                }
                Piece::Bishop => {
                    tables
                        .bishop
                        .get_attacks(from_sq.index() as usize, all_pieces)
                        & king_zone
                }
                Piece::Rook => {
                    tables.rook.get_attacks(from_sq.index() as usize, all_pieces) & king_zone
                }
                Piece::Queen => {
                    (tables
                        .bishop
                        .get_attacks(from_sq.index() as usize, all_pieces)
                        | tables
                            .rook
                            .get_attacks(from_sq.index() as usize, all_pieces))
                        & king_zone
                }
                _ => 0,
            };

            if zone_attacks != 0 {
                total_units += KING_ATTACK_UNITS[piece_type as usize] * zone_attacks.count_ones() as i32;
            }
        }
    }

    total_units
}

fn eval_mobility(board: &Board, tables: &MagicTables, color: Color, phase: i32) -> i32 {
    let mut score = 0;
    let us_bb = board.occupancy(color);
    let them_bb = board.opponent_occupancy(color);
    let occupied = us_bb | them_bb;
    let idx = color as usize;

    // Knights
    for sq in BitIter(board.piece_bb[idx][Piece::Knight as usize]) {
        let attacks = crate::moves::magic::get_knight_attacks(sq);
        let count = ((attacks & !us_bb).count_ones() as usize).min(KNIGHT_MOBILITY.len() - 1);
        score += taper(KNIGHT_MOBILITY[count], phase);
    }

    // Bishops
    for sq in BitIter(board.piece_bb[idx][Piece::Bishop as usize]) {
        let attacks = tables.bishop.get_attacks(sq, occupied);
        let count = ((attacks & !us_bb).count_ones() as usize).min(BISHOP_MOBILITY.len() - 1);
        score += taper(BISHOP_MOBILITY[count], phase);
    }

    // Rooks
    for sq in BitIter(board.piece_bb[idx][Piece::Rook as usize]) {
        let attacks = tables.rook.get_attacks(sq, occupied);
        let count = ((attacks & !us_bb).count_ones() as usize).min(ROOK_MOBILITY.len() - 1);
        score += taper(ROOK_MOBILITY[count], phase);
    }

    // Queens
    for sq in BitIter(board.piece_bb[idx][Piece::Queen as usize]) {
        let attacks = tables.bishop.get_attacks(sq, occupied) | tables.rook.get_attacks(sq, occupied);
        let count = ((attacks & !us_bb).count_ones() as usize).min(QUEEN_MOBILITY.len() - 1);
        score += taper(QUEEN_MOBILITY[count], phase);
    }

    score
}

// --- BITWISE HELPERS ---
const FILE_A: u64 = 0x0101010101010101;
const FILE_H: u64 = 0x8080808080808080;
const RANK_1: u64 = 0xFF00_0000_0000_0000; // White's back rank (row 7)
const RANK_8: u64 = 0x0000_0000_0000_00FF; // Black's back rank (row 0)

/// Helper: Smear pawns up and down to fill their entire file.
/// Used to detect if a file has *any* pawns efficiently.
#[inline(always)]
fn file_fill(mut pawns: u64) -> u64 {
    pawns |= pawns >> 8;
    pawns |= pawns >> 16;
    pawns |= pawns >> 32;
    pawns |= pawns << 8;
    pawns |= pawns << 16;
    pawns |= pawns << 32;
    pawns
}

#[inline(always)]
fn white_pawn_attacks_bb(wp: u64) -> u64 {
    ((wp & !FILE_A) >> 9) | ((wp & !FILE_H) >> 7)
}

#[inline(always)]
fn black_pawn_attacks_bb(bp: u64) -> u64 {
    ((bp & !FILE_A) << 7) | ((bp & !FILE_H) << 9)
}

pub fn evaluate_pawn_structure(board: &Board) -> i32 {
    let wp = board.pieces(Piece::Pawn, Color::White);
    let bp = board.pieces(Piece::Pawn, Color::Black);

    let w_attacks = white_pawn_attacks_bb(wp);
    let b_attacks = black_pawn_attacks_bb(bp);

    let mut white_score = 0;
    let mut black_score = 0;

    // --- 1. Doubled Pawns, scaled by stack height ---
    // Each extra pawn stacked on a file costs DOUBLED_PAWN_PENALTY.
    for file in 0..8u32 {
        let file_mask = FILE_A << file;
        let w_count = (wp & file_mask).count_ones() as i32;
        if w_count > 1 {
            white_score += DOUBLED_PAWN_PENALTY * (w_count - 1);
        }
        let b_count = (bp & file_mask).count_ones() as i32;
        if b_count > 1 {
            black_score += DOUBLED_PAWN_PENALTY * (b_count - 1);
        }
    }

    // --- 2. Isolated files (no friendly pawn on either adjacent file) ---
    let w_file_mask = file_fill(wp);
    let b_file_mask = file_fill(bp);

    let w_neighbor_files = ((w_file_mask & !FILE_H) << 1) | ((w_file_mask & !FILE_A) >> 1);
    let b_neighbor_files = ((b_file_mask & !FILE_H) << 1) | ((b_file_mask & !FILE_A) >> 1);

    let w_isolated_files = w_file_mask & !w_neighbor_files;
    let b_isolated_files = b_file_mask & !b_neighbor_files;

    // Tracks which files hold a passed pawn, for the connected-passers bonus.
    let mut w_passed_files = 0u8;
    let mut b_passed_files = 0u8;

    // --- 3. Per-pawn terms: backwards / isolated / passed ---
    let mut w_iter = wp;
    while w_iter != 0 {
        let sq = pop_lsb(&mut w_iter) as usize;
        let rank = sq / 8;
        let file = sq % 8;
        let file_bit = 1u8 << file;

        let mut adj_files = 0u64;
        if file > 0 {
            adj_files |= FILE_A << (file - 1);
        }
        if file < 7 {
            adj_files |= FILE_A << (file + 1);
        }

        // "Equally or more advanced" neighbor: same file-set, row <= this pawn's row.
        let at_or_ahead = if rank < 7 {
            !((1u64 << ((rank + 1) * 8)) - 1) | (1u64 << (rank * 8 + file))
        } else {
            u64::MAX
        };
        let no_advanced_neighbor = wp & adj_files & !at_or_ahead == 0;

        let front_sq_attacked = rank > 0 && (b_attacks & (1u64 << (sq - 8))) != 0;
        let is_backwards = no_advanced_neighbor && front_sq_attacked;

        if is_backwards {
            white_score += BACKWARDS_PAWN_PENALTY;
        } else if (w_isolated_files & (1u64 << sq)) != 0 {
            white_score += ISOLATED_PAWN_PENALTY;
        }

        // Front span: all squares ahead of this pawn. Row 0 is rank 8, so
        // White's "ahead" means lower rows.
        let front_mask = if rank > 0 {
            (1u64 << (rank * 8)) - 1
        } else {
            0
        };
        let passer_file_mask = (FILE_A << file) | adj_files;

        if (bp & passer_file_mask & front_mask) == 0 {
            w_passed_files |= file_bit;
            white_score += PASSED_PAWN_BONUS[7 - rank];
        }
    }

    let mut b_iter = bp;
    while b_iter != 0 {
        let sq = pop_lsb(&mut b_iter) as usize;
        let rank = sq / 8;
        let file = sq % 8;
        let file_bit = 1u8 << file;

        let mut adj_files = 0u64;
        if file > 0 {
            adj_files |= FILE_A << (file - 1);
        }
        if file < 7 {
            adj_files |= FILE_A << (file + 1);
        }

        // Black advances toward higher rows, so "equally or more advanced"
        // means row >= this pawn's row.
        let at_or_behind = if rank > 0 {
            (1u64 << (rank * 8)) - 1 | (1u64 << (rank * 8 + file))
        } else {
            1u64 << (rank * 8 + file)
        };
        let no_advanced_neighbor = bp & adj_files & !at_or_behind == 0;

        let front_sq_attacked = rank < 7 && (w_attacks & (1u64 << (sq + 8))) != 0;
        let is_backwards = no_advanced_neighbor && front_sq_attacked;

        if is_backwards {
            black_score += BACKWARDS_PAWN_PENALTY;
        } else if (b_isolated_files & (1u64 << sq)) != 0 {
            black_score += ISOLATED_PAWN_PENALTY;
        }

        // Front span: all squares ahead of this pawn. Row 0 is rank 8, so
        // Black's "ahead" means higher rows.
        let front_mask = if rank < 7 {
            !((1u64 << ((rank + 1) * 8)) - 1)
        } else {
            0
        };
        let passer_file_mask = (FILE_A << file) | adj_files;

        if (wp & passer_file_mask & front_mask) == 0 {
            b_passed_files |= file_bit;
            black_score += PASSED_PAWN_BONUS[rank];
        }
    }

    // --- 4. Connected passers: bonus when two adjacent files both hold one ---
    let w_connected = w_passed_files & ((w_passed_files << 1) | (w_passed_files >> 1));
    white_score += w_connected.count_ones() as i32 * CONNECTED_PASSERS_BONUS;

    let b_connected = b_passed_files & ((b_passed_files << 1) | (b_passed_files >> 1));
    black_score += b_connected.count_ones() as i32 * CONNECTED_PASSERS_BONUS;

    white_score - black_score
}

// Renamed from evaluate to pesto_eval
pub fn pesto_eval(board: &Board) -> i32 {
    let mut mg_score = 0;
    let mut eg_score = 0;
    let phase = calculate_phase(board);

    // Iterate over all piece types
    // Note: Iterate over colors for efficiency if needed, but per piece type is fine
    for piece_type in [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ] {
        let (mg_val, eg_val) = get_piece_value(piece_type);
        let (mg_table, eg_table) = get_psqt(piece_type);

        // White pieces
        let mut w_bb = board.pieces(piece_type, Color::White);
        while w_bb != 0 {
            let sq = pop_lsb(&mut w_bb);
            // FIX: Mirror White to match Table Layout (Rank 8 at index 0)
            let table_sq = mirror_vert(sq);
            mg_score += mg_val + mg_table[table_sq];
            eg_score += eg_val + eg_table[table_sq];
        }

        // Black pieces
        let mut b_bb = board.pieces(piece_type, Color::Black);
        while b_bb != 0 {
            let sq = pop_lsb(&mut b_bb);
            // FIX: Black is already at the "top", read directly
            mg_score -= mg_val + mg_table[sq as usize];
            eg_score -= eg_val + eg_table[sq as usize];
        }
    }

    // Tapered Formula
    // Score = (MG * Phase + EG * (24 - Phase)) / 24
    (mg_score * phase + eg_score * (TOTAL_PHASE - phase)) / TOTAL_PHASE
}

// Debug helper: returns just the material component (tapered)
pub fn eval_material(board: &Board) -> i32 {
    let mut mg_score = 0;
    let mut eg_score = 0;
    let phase = calculate_phase(board);

    for piece_type in [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ] {
        let (mg_val, eg_val) = get_piece_value(piece_type);

        let w_count = board.pieces(piece_type, Color::White).count_ones() as i32;
        let b_count = board.pieces(piece_type, Color::Black).count_ones() as i32;

        mg_score += mg_val * (w_count - b_count);
        eg_score += eg_val * (w_count - b_count);
    }

    (mg_score * phase + eg_score * (TOTAL_PHASE - phase)) / TOTAL_PHASE
}

// Debug helper: returns just the PSQT component (tapered)
pub fn eval_psqt(board: &Board) -> i32 {
    let mut mg_score = 0;
    let mut eg_score = 0;
    let phase = calculate_phase(board);

    for piece_type in [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ] {
        let (mg_table, eg_table) = get_psqt(piece_type);

        let mut w_bb = board.pieces(piece_type, Color::White);
        while w_bb != 0 {
            let sq = pop_lsb(&mut w_bb);
            let table_sq = mirror_vert(sq);
            mg_score += mg_table[table_sq];
            eg_score += eg_table[table_sq];
        }

        let mut b_bb = board.pieces(piece_type, Color::Black);
        while b_bb != 0 {
            let sq = pop_lsb(&mut b_bb);
            mg_score -= mg_table[sq as usize];
            eg_score -= eg_table[sq as usize];
        }
    }

    (mg_score * phase + eg_score * (TOTAL_PHASE - phase)) / TOTAL_PHASE
}

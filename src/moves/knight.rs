// src/moves/knight.rs

use once_cell::sync::Lazy;

pub static KNIGHT_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| {
    const DELTAS: [(i32, i32); 8] = [
        (1, 2), (2, 1), (2, -1), (1, -2),
        (-1, -2), (-2, -1), (-2, 1), (-1, 2),
    ];
    let mut table = [0u64; 64];
    for row in 0i32..8 {
        for file in 0i32..8 {
            let sq = (row * 8 + file) as usize;
            let mut attacks = 0u64;
            for (dr, df) in DELTAS {
                let r = row + dr;
                let f = file + df;
                if (0..8).contains(&r) && (0..8).contains(&f) {
                    attacks |= 1u64 << (r * 8 + f);
                }
            }
            table[sq] = attacks;
        }
    }
    table
});

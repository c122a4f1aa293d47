// src/moves/magic/precompute.rs

use crate::moves::magic::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use crate::moves::magic::search::find_magic_number_for_square;
use crate::moves::magic::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::{RngCore, SeedableRng, rngs::StdRng};

#[derive(Clone, Copy, Debug)]
pub enum MagicTableSeed {
    Fixed(u64),
    Random,
}

fn make_rng(seed: MagicTableSeed) -> StdRng {
    match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicTableSeed::Random => {
            let mut bytes = [0u8; 32];
            rand::rng().fill_bytes(&mut bytes);
            StdRng::from_seed(bytes)
        }
    }
}

/// Relevant occupancy mask for a rook on `square` (excludes board edges along
/// each ray, since the edge square itself never changes the attack set).
fn rook_relevant_mask(square: usize) -> u64 {
    let rank = (square / 8) as isize;
    let file = (square % 8) as isize;
    let mut mask = 0u64;

    for r in (rank + 1)..7 {
        mask |= 1u64 << (r * 8 + file);
    }
    for r in 1..rank {
        mask |= 1u64 << (r * 8 + file);
    }
    for f in (file + 1)..7 {
        mask |= 1u64 << (rank * 8 + f);
    }
    for f in 1..file {
        mask |= 1u64 << (rank * 8 + f);
    }
    mask
}

fn bishop_relevant_mask(square: usize) -> u64 {
    let rank = (square / 8) as isize;
    let file = (square % 8) as isize;
    let mut mask = 0u64;

    let mut r = rank + 1;
    let mut f = file + 1;
    while r < 7 && f < 7 {
        mask |= 1u64 << (r * 8 + f);
        r += 1;
        f += 1;
    }
    let mut r = rank - 1;
    let mut f = file - 1;
    while r > 0 && f > 0 {
        mask |= 1u64 << (r * 8 + f);
        r -= 1;
        f -= 1;
    }
    let mut r = rank + 1;
    let mut f = file - 1;
    while r < 7 && f > 0 {
        mask |= 1u64 << (r * 8 + f);
        r += 1;
        f -= 1;
    }
    let mut r = rank - 1;
    let mut f = file + 1;
    while r > 0 && f < 7 {
        mask |= 1u64 << (r * 8 + f);
        r -= 1;
        f += 1;
    }
    mask
}

/// Enumerates every subset of `mask` (occupancy permutations).
fn occupancy_subsets(mask: u64) -> Vec<u64> {
    let bits: Vec<u32> = (0..64).filter(|&i| (mask >> i) & 1 != 0).collect();
    let n = bits.len();
    let mut out = Vec::with_capacity(1 << n);
    for subset in 0..(1u32 << n) {
        let mut occ = 0u64;
        for (i, &bit) in bits.iter().enumerate() {
            if (subset >> i) & 1 != 0 {
                occ |= 1u64 << bit;
            }
        }
        out.push(occ);
    }
    out
}

fn build_entry<R: RngCore>(
    square: usize,
    mask: u64,
    attack_fn: impl Fn(usize, u64) -> u64,
    rng: &mut R,
) -> Result<MagicEntry, String> {
    let shift = 64 - mask.count_ones();
    let blockers = occupancy_subsets(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| attack_fn(square, b)).collect();

    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

    let table_size = 1usize << (64 - shift);
    let mut table = vec![0u64; table_size];
    for (&b, &a) in blockers.iter().zip(attacks.iter()) {
        let idx = ((b.wrapping_mul(magic)) >> shift) as usize;
        table[idx] = a;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = make_rng(seed);

    let mut rook_entries = Vec::with_capacity(64);
    let mut bishop_entries = Vec::with_capacity(64);

    for square in 0..64 {
        let rmask = rook_relevant_mask(square);
        rook_entries.push(build_entry(square, rmask, rook_attacks_per_square, &mut rng)?);

        let bmask = bishop_relevant_mask(square);
        bishop_entries.push(build_entry(square, bmask, bishop_attacks_per_square, &mut rng)?);
    }

    Ok(MagicTables {
        rook: RookMagicTables { entries: rook_entries },
        bishop: BishopMagicTables { entries: bishop_entries },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_tables_with_fixed_seed() {
        let tables = generate_magic_tables(MagicTableSeed::Fixed(0x45)).expect("magic generation failed");
        assert_eq!(tables.rook.entries.len(), 64);
        assert_eq!(tables.bishop.entries.len(), 64);
    }
}

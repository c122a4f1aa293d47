// src/moves/magic/loader.rs

use crate::moves::magic::precompute::{MagicTableSeed, generate_magic_tables};
use crate::moves::magic::structs::MagicTables;

#[cfg(feature = "load_magic")]
const SERIALIZED_MAGIC_TABLES: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/magic_tables.bin"));

/// Produces a ready-to-use set of magic tables for bishop and rook attacks.
///
/// With `load_magic` enabled this deserializes a precomputed table baked in
/// at build time. Otherwise it generates a fresh table; with
/// `deterministic_magic` the search uses a fixed seed so repeated runs agree.
pub fn load_magic_tables() -> MagicTables {
    #[cfg(feature = "load_magic")]
    {
        bincode::deserialize(SERIALIZED_MAGIC_TABLES).expect("failed to deserialize magic tables")
    }

    #[cfg(not(feature = "load_magic"))]
    {
        let seed = if cfg!(feature = "deterministic_magic") {
            MagicTableSeed::Fixed(0x9E37_79B9_7F4A_7C15)
        } else {
            MagicTableSeed::Random
        };
        generate_magic_tables(seed).expect("failed to generate magic tables")
    }
}

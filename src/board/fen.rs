// src/board/fen.rs
//
// FEN parsing and serialization. Board rows are stored rank-8-first, which
// lines up directly with FEN's own rank-8-first field order, so no rank
// flip is needed while walking either direction.

use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR};
use super::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color};
use crate::square::Square;

impl Board {
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(format!("FEN needs at least 4 fields, got {}", fields.len()));
        }

        *self = Board::new_empty();

        let mut row = 0u8;
        let mut file = 0u8;
        for ch in fields[0].chars() {
            match ch {
                '/' => {
                    if file != 8 {
                        return Err(format!("rank {} has {} files, expected 8", row + 1, file));
                    }
                    row += 1;
                    file = 0;
                }
                '1'..='8' => {
                    file += ch as u8 - b'0';
                }
                c => {
                    if file >= 8 || row >= 8 {
                        return Err(format!("piece placement overruns the board at '{}'", c));
                    }
                    let (piece, color) = CHAR_TO_PC[c as usize]
                        .ok_or_else(|| format!("invalid piece glyph '{}'", c))?;
                    let sq = Square::make(row, file);
                    let bb = self.bb(color, piece) | (1u64 << sq.index());
                    self.set_bb(color, piece, bb);
                    file += 1;
                }
            }
        }
        if row != 7 || file != 8 {
            return Err("piece placement field does not cover 8 ranks".to_string());
        }

        self.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("invalid side to move '{}'", other)),
        };

        self.castling_rights = 0;
        if fields[2] != "-" {
            for ch in fields[2].chars() {
                self.castling_rights |= match ch {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    other => return Err(format!("invalid castling glyph '{}'", other)),
                };
            }
        }

        self.en_passant = if fields[3] == "-" {
            None
        } else {
            Some(
                fields[3]
                    .parse::<Square>()
                    .map_err(|e| format!("invalid en passant square: {}", e))?,
            )
        };

        self.halfmove_clock = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        self.fullmove_number = fields.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);

        self.refresh_zobrist();
        self.history.clear();
        self.validate()?;
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(64);

        for row in 0..8u8 {
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let sq = Square::make(row, file);
                match self.piece_type_at(sq).zip(self.color_at(sq)) {
                    Some((piece, color)) => {
                        if empty_run > 0 {
                            out.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        let idx = (color as usize) * 6 + (piece as usize);
                        out.push(PC_TO_CHAR[idx]);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                out.push((b'0' + empty_run) as char);
            }
            if row != 7 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        if self.castling_rights == 0 {
            out.push('-');
        } else {
            if self.castling_rights & CASTLE_WK != 0 {
                out.push('K');
            }
            if self.castling_rights & CASTLE_WQ != 0 {
                out.push('Q');
            }
            if self.castling_rights & CASTLE_BK != 0 {
                out.push('k');
            }
            if self.castling_rights & CASTLE_BQ != 0 {
                out.push('q');
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        out
    }
}

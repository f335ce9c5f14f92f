// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::fmt::Write as _;

use crate::{
    table::{TableEntry, TableState},
    worlds::{WorldCategory, world},
};

pub const MESSAGE_CHAR_LIMIT: usize = 2000;

const ANSI_RESET: &str = "\u{1b}[0m";

fn category_color(category: WorldCategory) -> Option<&'static str> {
    match category {
        WorldCategory::Members => None,
        WorldCategory::FreeToPlay => Some("\u{1b}[0;32m"),
        WorldCategory::Special => Some("\u{1b}[0;33m"),
        WorldCategory::Local => Some("\u{1b}[0;34m"),
    }
}

fn render_row(entry: &TableEntry) -> String {
    let line = format!(
        "{:<5} {:<14} {:<4} {:<5}",
        entry.world,
        entry.region.map(|region| region.label()).unwrap_or(""),
        entry.size.map(|size| size.code()).unwrap_or_default(),
        entry.game_time.as_deref().unwrap_or(""),
    );
    match world(entry.world).and_then(|world| category_color(world.category())) {
        Some(color) => format!("{color}{line}{ANSI_RESET}"),
        None => line,
    }
}

pub fn render_chunk(state: &TableState, chunk: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "**Star Table {}/{}**", chunk + 1, state.chunk_count());
    out.push_str("```ansi\n");
    let _ = writeln!(out, "{:<5} {:<14} {:<4} {:<5}", "World", "Region", "Size", "Ends");
    let _ = writeln!(out, "{:-<5} {:-<14} {:-<4} {:-<5}", "", "", "", "");
    for entry in state.chunk_rows(chunk) {
        out.push_str(&render_row(entry));
        out.push('\n');
    }
    out.push_str("```");
    out
}

pub fn render_all(state: &TableState) -> Vec<String> {
    (0..state.chunk_count())
        .map(|chunk| render_chunk(state, chunk))
        .collect()
}

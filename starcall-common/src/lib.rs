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

//! Shared model of the star table: the world list, call fields, the table
//! state with its chunking rules, the chunk renderer and read queries.

use std::sync::LazyLock;

use regex::Regex;

pub mod model;
pub mod query;
pub mod render;
pub mod table;
pub mod worlds;

pub use model::{ALL_REGIONS, ALL_SIZES, Region, StarSize};
pub use query::{QueryFilter, STARSTRUCK_MIN_SIZE, StarHit, format_results};
pub use render::{MESSAGE_CHAR_LIMIT, render_all, render_chunk};
pub use table::{CHUNK_SIZE, SCHEMA_VERSION, StateError, TableEntry, TableError, TableState};
pub use worlds::{Membership, WORLDS, World, WorldCategory, WorldTag, is_known_world, world};

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Replace `${VAR_NAME}` patterns in a string with values from environment variables.
/// Unknown or unset variables are replaced with an empty string.
pub fn expand_env_vars(input: &str) -> String {
    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_env_vars_leaves_plain_text() {
        assert_eq!(expand_env_vars("state_path: table.json"), "state_path: table.json");
    }

    #[test]
    fn expand_env_vars_blanks_unset_variables() {
        assert_eq!(
            expand_env_vars("report_url: ${STARCALL_TEST_SURELY_UNSET_VAR}"),
            "report_url: "
        );
    }

    #[test]
    fn expand_env_vars_reads_environment() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_vars("p=${PATH}"), format!("p={path}"));
    }
}

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

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{
    model::{Region, StarSize},
    render::MESSAGE_CHAR_LIMIT,
    table::{TableEntry, TableState},
    worlds::{Membership, world},
};

pub const STARSTRUCK_MIN_SIZE: StarSize = StarSize::S6;

static GAME_TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub membership: Option<Membership>,
    pub size: Option<StarSize>,
    pub min_size: Option<StarSize>,
    pub region: Option<Region>,
    pub world: Option<u16>,
}

impl QueryFilter {
    pub fn membership(membership: Option<Membership>) -> Self {
        Self {
            membership,
            ..Self::default()
        }
    }

    fn matches(&self, hit: &StarHit) -> bool {
        self.membership.is_none_or(|wanted| hit.membership == wanted)
            && self.size.is_none_or(|wanted| hit.size == wanted)
            && self.min_size.is_none_or(|floor| hit.size >= floor)
            && self.region.is_none_or(|wanted| hit.region == wanted)
            && self.world.is_none_or(|wanted| hit.world == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarHit {
    pub world: u16,
    pub membership: Membership,
    pub region: Region,
    pub size: StarSize,
    pub game_time: String,
    pub expires_at: DateTime<Utc>,
}

impl StarHit {
    fn from_entry(entry: &TableEntry, now: DateTime<Utc>) -> Option<Self> {
        let game_time = entry.game_time.as_deref()?;
        if !GAME_TIME_RE.is_match(game_time) {
            return None;
        }
        let expires_at = entry.game_time_full?;
        if expires_at <= now {
            return None;
        }
        Some(Self {
            world: entry.world,
            membership: world(entry.world)?.membership,
            region: entry.region?,
            size: entry.size?,
            game_time: game_time.to_string(),
            expires_at,
        })
    }

    pub fn format_line(&self) -> String {
        let f2p = if self.membership == Membership::FreeToPlay {
            " (F2P)"
        } else {
            ""
        };
        format!(
            "**W{}**{} · {} · {} · ends {} (<t:{}:R>)",
            self.world,
            f2p,
            self.region.link(),
            self.size,
            self.game_time,
            self.expires_at.timestamp()
        )
    }
}

pub fn active_hits(state: &TableState, now: DateTime<Utc>) -> Vec<StarHit> {
    state
        .entries
        .iter()
        .filter_map(|entry| StarHit::from_entry(entry, now))
        .collect()
}

fn sort_largest_first(hits: &mut [StarHit]) {
    hits.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then(a.expires_at.cmp(&b.expires_at))
            .then(a.world.cmp(&b.world))
    });
}

/// Active calls of the largest called size, ties included, soonest first.
pub fn find_best(
    state: &TableState,
    membership: Option<Membership>,
    now: DateTime<Utc>,
) -> Vec<StarHit> {
    let filter = QueryFilter::membership(membership);
    let hits: Vec<StarHit> = active_hits(state, now)
        .into_iter()
        .filter(|hit| filter.matches(hit))
        .collect();
    let Some(largest) = hits.iter().map(|hit| hit.size).max() else {
        return Vec::new();
    };
    let mut best: Vec<StarHit> = hits.into_iter().filter(|hit| hit.size == largest).collect();
    sort_largest_first(&mut best);
    best
}

pub fn find_matching(state: &TableState, filter: &QueryFilter, now: DateTime<Utc>) -> Vec<StarHit> {
    let mut hits: Vec<StarHit> = active_hits(state, now)
        .into_iter()
        .filter(|hit| filter.matches(hit))
        .collect();
    sort_largest_first(&mut hits);
    hits
}

pub fn find_world(state: &TableState, world: u16, now: DateTime<Utc>) -> Option<StarHit> {
    let filter = QueryFilter {
        world: Some(world),
        ..QueryFilter::default()
    };
    find_matching(state, &filter, now).into_iter().next()
}

pub fn starstruck(
    state: &TableState,
    membership: Option<Membership>,
    now: DateTime<Utc>,
) -> Vec<StarHit> {
    let filter = QueryFilter {
        membership,
        min_size: Some(STARSTRUCK_MIN_SIZE),
        ..QueryFilter::default()
    };
    find_matching(state, &filter, now)
}

pub fn format_results(title: &str, hits: &[StarHit], empty_notice: &str) -> Vec<String> {
    let header = format!("**{title}**");
    if hits.is_empty() {
        return vec![format!("{header}\n{empty_notice}")];
    }

    let mut pages = Vec::new();
    let mut page = header;
    for line in hits.iter().map(StarHit::format_line) {
        if page.chars().count() + 1 + line.chars().count() > MESSAGE_CHAR_LIMIT {
            pages.push(std::mem::take(&mut page));
        }
        if !page.is_empty() {
            page.push('\n');
        }
        page.push_str(&line);
    }
    pages.push(page);
    pages
}

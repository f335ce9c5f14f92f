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

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Membership {
    Members,
    #[serde(rename = "Free-to-play")]
    FreeToPlay,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorldTag {
    Special,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldCategory {
    Members,
    FreeToPlay,
    Special,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct World {
    pub id: u16,
    pub membership: Membership,
    pub tag: Option<WorldTag>,
}

impl World {
    const fn new(id: u16, membership: Membership, tag: Option<WorldTag>) -> Self {
        Self {
            id,
            membership,
            tag,
        }
    }

    pub fn category(&self) -> WorldCategory {
        match (self.tag, self.membership) {
            (Some(WorldTag::Special), _) => WorldCategory::Special,
            (Some(WorldTag::Local), _) => WorldCategory::Local,
            (None, Membership::Members) => WorldCategory::Members,
            (None, Membership::FreeToPlay) => WorldCategory::FreeToPlay,
        }
    }

    pub fn is_free_to_play(&self) -> bool {
        self.membership == Membership::FreeToPlay
    }
}

/// Every world in table order. Table rows are index-aligned with this list.
pub const WORLDS: [World; 137] = [
    World::new(1, Membership::Members, None),
    World::new(2, Membership::Members, None),
    World::new(3, Membership::FreeToPlay, None),
    World::new(4, Membership::Members, None),
    World::new(5, Membership::Members, None),
    World::new(6, Membership::Members, None),
    World::new(7, Membership::FreeToPlay, None),
    World::new(8, Membership::FreeToPlay, None),
    World::new(9, Membership::Members, None),
    World::new(10, Membership::Members, None),
    World::new(11, Membership::FreeToPlay, None),
    World::new(12, Membership::Members, None),
    World::new(14, Membership::Members, None),
    World::new(15, Membership::Members, None),
    World::new(16, Membership::Members, None),
    World::new(17, Membership::FreeToPlay, None),
    World::new(18, Membership::Members, None),
    World::new(19, Membership::FreeToPlay, None),
    World::new(20, Membership::FreeToPlay, None),
    World::new(21, Membership::Members, None),
    World::new(22, Membership::Members, None),
    World::new(23, Membership::Members, None),
    World::new(24, Membership::Members, None),
    World::new(25, Membership::Members, None),
    World::new(26, Membership::Members, None),
    World::new(27, Membership::Members, None),
    World::new(28, Membership::Members, None),
    World::new(29, Membership::FreeToPlay, None),
    World::new(30, Membership::Members, None),
    World::new(31, Membership::Members, None),
    World::new(32, Membership::Members, None),
    World::new(33, Membership::FreeToPlay, None),
    World::new(34, Membership::FreeToPlay, None),
    World::new(35, Membership::Members, None),
    World::new(36, Membership::Members, None),
    World::new(37, Membership::Members, None),
    World::new(38, Membership::FreeToPlay, None),
    World::new(39, Membership::Members, None),
    World::new(40, Membership::Members, None),
    World::new(41, Membership::FreeToPlay, None),
    World::new(42, Membership::Members, None),
    World::new(43, Membership::FreeToPlay, None),
    World::new(44, Membership::Members, None),
    World::new(45, Membership::Members, None),
    World::new(46, Membership::Members, None),
    World::new(47, Membership::Members, None),
    World::new(48, Membership::Members, None),
    World::new(49, Membership::Members, None),
    World::new(50, Membership::Members, None),
    World::new(51, Membership::Members, None),
    World::new(52, Membership::Members, None),
    World::new(53, Membership::Members, None),
    World::new(54, Membership::Members, None),
    World::new(55, Membership::FreeToPlay, None),
    World::new(56, Membership::Members, None),
    World::new(57, Membership::FreeToPlay, None),
    World::new(58, Membership::Members, None),
    World::new(59, Membership::Members, None),
    World::new(60, Membership::Members, None),
    World::new(61, Membership::FreeToPlay, None),
    World::new(62, Membership::Members, None),
    World::new(63, Membership::Members, None),
    World::new(64, Membership::Members, None),
    World::new(65, Membership::Members, None),
    World::new(66, Membership::Members, None),
    World::new(67, Membership::Members, None),
    World::new(68, Membership::Members, None),
    World::new(69, Membership::Members, None),
    World::new(70, Membership::Members, None),
    World::new(71, Membership::Members, None),
    World::new(72, Membership::Members, None),
    World::new(73, Membership::Members, None),
    World::new(74, Membership::Members, None),
    World::new(75, Membership::Members, None),
    World::new(76, Membership::Members, None),
    World::new(77, Membership::Members, None),
    World::new(78, Membership::Members, None),
    World::new(79, Membership::Members, None),
    World::new(80, Membership::FreeToPlay, None),
    World::new(81, Membership::FreeToPlay, None),
    World::new(82, Membership::Members, None),
    World::new(83, Membership::Members, None),
    World::new(84, Membership::Members, None),
    World::new(85, Membership::Members, None),
    World::new(86, Membership::Members, None),
    World::new(87, Membership::Members, None),
    World::new(88, Membership::Members, None),
    World::new(89, Membership::Members, None),
    World::new(91, Membership::Members, None),
    World::new(92, Membership::Members, None),
    World::new(94, Membership::FreeToPlay, None),
    World::new(96, Membership::Members, None),
    World::new(97, Membership::Members, None),
    World::new(98, Membership::Members, None),
    World::new(99, Membership::Members, None),
    World::new(100, Membership::Members, None),
    World::new(101, Membership::Members, None),
    World::new(102, Membership::Members, None),
    World::new(103, Membership::Members, None),
    World::new(104, Membership::Members, None),
    World::new(105, Membership::Members, None),
    World::new(106, Membership::Members, None),
    World::new(108, Membership::FreeToPlay, None),
    World::new(114, Membership::Members, None),
    World::new(115, Membership::Members, None),
    World::new(116, Membership::Members, None),
    World::new(117, Membership::Members, None),
    World::new(118, Membership::Members, None),
    World::new(119, Membership::Members, None),
    World::new(120, Membership::FreeToPlay, None),
    World::new(121, Membership::Members, None),
    World::new(122, Membership::FreeToPlay, None),
    World::new(123, Membership::Members, None),
    World::new(124, Membership::Members, None),
    World::new(134, Membership::Members, None),
    World::new(135, Membership::FreeToPlay, None),
    World::new(136, Membership::FreeToPlay, None),
    World::new(137, Membership::Members, None),
    World::new(138, Membership::Members, None),
    World::new(139, Membership::Members, None),
    World::new(140, Membership::Members, None),
    World::new(141, Membership::FreeToPlay, None),
    World::new(210, Membership::FreeToPlay, None),
    World::new(215, Membership::FreeToPlay, None),
    World::new(225, Membership::FreeToPlay, None),
    World::new(236, Membership::FreeToPlay, None),
    World::new(239, Membership::FreeToPlay, None),
    World::new(245, Membership::FreeToPlay, None),
    World::new(249, Membership::FreeToPlay, None),
    World::new(250, Membership::FreeToPlay, None),
    World::new(251, Membership::FreeToPlay, None),
    World::new(252, Membership::Members, None),
    World::new(255, Membership::FreeToPlay, None),
    World::new(256, Membership::FreeToPlay, None),
    World::new(257, Membership::Members, None),
    World::new(258, Membership::Members, None),
    World::new(259, Membership::Members, None),
];

/// Position of `id` in [`WORLDS`], which is also its row in the table.
pub fn world_index(id: u16) -> Option<usize> {
    WORLDS.binary_search_by_key(&id, |world| world.id).ok()
}

pub fn world(id: u16) -> Option<&'static World> {
    world_index(id).map(|index| &WORLDS[index])
}

pub fn is_known_world(id: u16) -> bool {
    world_index(id).is_some()
}

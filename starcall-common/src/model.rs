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

use std::fmt;

use serde::{Deserialize, Serialize};

pub const ALL_REGIONS: [Region; 14] = [
    Region::Asgarnia,
    Region::CrandorKaramja,
    Region::FeldipHills,
    Region::FossilIsland,
    Region::Fremennik,
    Region::Kandarin,
    Region::KebosLands,
    Region::KharidianDesert,
    Region::Misthalin,
    Region::Morytania,
    Region::Piscatoris,
    Region::Tirannwn,
    Region::Wilderness,
    Region::Varlamore,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Asgarnia,
    CrandorKaramja,
    FeldipHills,
    FossilIsland,
    Fremennik,
    Kandarin,
    KebosLands,
    KharidianDesert,
    Misthalin,
    Morytania,
    Piscatoris,
    Tirannwn,
    Wilderness,
    Varlamore,
}

impl Region {
    pub fn name(self) -> &'static str {
        match self {
            Self::Asgarnia => "Asgarnia",
            Self::CrandorKaramja => "Crandor/Karamja",
            Self::FeldipHills => "Feldip Hills/Isle of Souls",
            Self::FossilIsland => "Fossil Island/Mos Le'Harmless",
            Self::Fremennik => "Fremennik Lands/Lunar Isle",
            Self::Kandarin => "Kandarin",
            Self::KebosLands => "Kebos Lands",
            Self::KharidianDesert => "Kharidian Desert",
            Self::Misthalin => "Misthalin",
            Self::Morytania => "Morytania",
            Self::Piscatoris => "Piscatoris/Gnome Stronghold",
            Self::Tirannwn => "Tirannwn",
            Self::Wilderness => "Wilderness",
            Self::Varlamore => "Varlamore",
        }
    }

    /// Short label that fits the fixed-width table column.
    pub fn label(self) -> &'static str {
        match self {
            Self::Asgarnia => "Asgarnia",
            Self::CrandorKaramja => "Karamja",
            Self::FeldipHills => "Feldip Hills",
            Self::FossilIsland => "Fossil Island",
            Self::Fremennik => "Fremennik",
            Self::Kandarin => "Kandarin",
            Self::KebosLands => "Kebos",
            Self::KharidianDesert => "Desert",
            Self::Misthalin => "Misthalin",
            Self::Morytania => "Morytania",
            Self::Piscatoris => "Piscatoris",
            Self::Tirannwn => "Tirannwn",
            Self::Wilderness => "Wilderness",
            Self::Varlamore => "Varlamore",
        }
    }

    pub fn wiki_url(self) -> &'static str {
        match self {
            Self::Asgarnia => "https://oldschool.runescape.wiki/w/Asgarnia",
            Self::CrandorKaramja => "https://oldschool.runescape.wiki/w/Karamja",
            Self::FeldipHills => "https://oldschool.runescape.wiki/w/Feldip_Hills",
            Self::FossilIsland => "https://oldschool.runescape.wiki/w/Fossil_Island",
            Self::Fremennik => "https://oldschool.runescape.wiki/w/Fremennik_Province",
            Self::Kandarin => "https://oldschool.runescape.wiki/w/Kandarin",
            Self::KebosLands => "https://oldschool.runescape.wiki/w/Kebos_Lowlands",
            Self::KharidianDesert => "https://oldschool.runescape.wiki/w/Kharidian_Desert",
            Self::Misthalin => "https://oldschool.runescape.wiki/w/Misthalin",
            Self::Morytania => "https://oldschool.runescape.wiki/w/Morytania",
            Self::Piscatoris => "https://oldschool.runescape.wiki/w/Piscatoris",
            Self::Tirannwn => "https://oldschool.runescape.wiki/w/Tirannwn",
            Self::Wilderness => "https://oldschool.runescape.wiki/w/Wilderness",
            Self::Varlamore => "https://oldschool.runescape.wiki/w/Varlamore",
        }
    }

    pub fn link(self) -> String {
        format!("[{}](<{}>)", self.name(), self.wiki_url())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const ALL_SIZES: [StarSize; 10] = [
    StarSize::S1,
    StarSize::S2,
    StarSize::S3,
    StarSize::S4,
    StarSize::S5,
    StarSize::S6,
    StarSize::S7,
    StarSize::S8,
    StarSize::S9,
    StarSize::S10,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StarSize {
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    S10,
}

impl StarSize {
    pub fn tier(self) -> u8 {
        self as u8 + 1
    }

    pub fn code(self) -> String {
        format!("s{}", self.tier())
    }
}

impl fmt::Display for StarSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.tier())
    }
}

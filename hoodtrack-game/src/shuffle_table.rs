use anyhow::{ensure, Context, Result};
use hashbrown::HashMap;
use json::JsonValue;
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

use crate::{ExitId, RegionId};

// Category of a randomizable exit in the static shuffle table. The category
// determines which connection class the exit belongs to and therefore how
// candidate destinations are computed and validated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
pub enum ExitCategory {
    Interior,
    SpecialInterior,
    Grotto,
    Grave,
    SpecialGrave,
    Dungeon,
    Overworld,
    OwlDrop,
    WarpSong,
    Spawn,
    BossDoor,
}

impl ExitCategory {
    pub fn is_one_entrance(self) -> bool {
        matches!(
            self,
            ExitCategory::Interior
                | ExitCategory::SpecialInterior
                | ExitCategory::Grotto
                | ExitCategory::Grave
                | ExitCategory::SpecialGrave
                | ExitCategory::Dungeon
                | ExitCategory::BossDoor
        )
    }

    // Warp-style categories have a fixed destination set, no pairing, and
    // never participate in the mixed pool.
    pub fn is_warp(self) -> bool {
        matches!(
            self,
            ExitCategory::OwlDrop | ExitCategory::WarpSong | ExitCategory::Spawn
        )
    }
}

// Which fungible group a one-entrance interior belongs to, if any.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum GrottoKind {
    GenericGrotto,
    ScrubGrotto,
    FairyFountain,
    GreatFairyFountain,
}

pub struct ShuffleRow {
    pub category: ExitCategory,
    pub forward: ExitId,
    pub reverse: Option<ExitId>,
    pub grotto_kind: Option<GrottoKind>,
}

#[derive(Default)]
pub struct ShuffleTable {
    pub rows: Vec<ShuffleRow>,
    pub row_by_exit: HashMap<ExitId, usize>,
    // Regions that are valid owl-flight / spawn targets beyond the ones
    // derived from the table itself (e.g. ledges reachable only by flight).
    pub extra_destinations: Vec<RegionId>,
}

impl ShuffleTable {
    pub fn load(
        table_json: &JsonValue,
        exit_id_by_name: &HashMap<String, ExitId>,
        region_index_by_key: &HashMap<String, RegionId>,
    ) -> Result<Self> {
        ensure!(table_json.is_array(), "Shuffle table must be an array");
        let mut table = ShuffleTable::default();
        for row_json in table_json.members() {
            let category_str = row_json["category"]
                .as_str()
                .context("Missing 'category' in shuffle table row")?;

            if category_str == "Extra" {
                let region_name = row_json["region"]
                    .as_str()
                    .context("Extra row requires a 'region'")?;
                let region_id = *region_index_by_key
                    .get(region_name)
                    .with_context(|| format!("Unknown extra destination '{}'", region_name))?;
                table.extra_destinations.push(region_id);
                continue;
            }

            let category = category_str
                .parse::<ExitCategory>()
                .ok()
                .with_context(|| format!("Unknown exit category '{}'", category_str))?;
            let forward_name = row_json["forward"]
                .as_str()
                .context("Missing 'forward' in shuffle table row")?;
            let forward = *exit_id_by_name
                .get(forward_name)
                .with_context(|| format!("Unknown exit '{}' in shuffle table", forward_name))?;
            let reverse = match row_json["reverse"].as_str() {
                Some(reverse_name) => Some(
                    *exit_id_by_name.get(reverse_name).with_context(|| {
                        format!("Unknown exit '{}' in shuffle table", reverse_name)
                    })?,
                ),
                None => None,
            };
            ensure!(
                !category.is_one_entrance() || reverse.is_some(),
                "Row for '{}' is a one-entrance category but has no reverse exit",
                forward_name
            );
            let grotto_kind = match row_json["grotto_kind"].as_str() {
                Some(s) => Some(
                    s.parse::<GrottoKind>()
                        .ok()
                        .with_context(|| format!("Unknown grotto kind '{}'", s))?,
                ),
                None => None,
            };

            let row_idx = table.rows.len();
            ensure!(
                table.row_by_exit.insert(forward, row_idx).is_none(),
                "Exit '{}' appears in multiple shuffle table rows",
                forward_name
            );
            if let Some(reverse) = reverse {
                ensure!(
                    table.row_by_exit.insert(reverse, row_idx).is_none(),
                    "Reverse exit of '{}' appears in multiple shuffle table rows",
                    forward_name
                );
            }
            table.rows.push(ShuffleRow {
                category,
                forward,
                reverse,
                grotto_kind,
            });
        }
        Ok(table)
    }

    pub fn row_for(&self, exit_id: ExitId) -> Option<&ShuffleRow> {
        self.row_by_exit.get(&exit_id).map(|&idx| &self.rows[idx])
    }

    // The other exit of the two-way connection this exit belongs to.
    pub fn partner(&self, exit_id: ExitId) -> Option<ExitId> {
        let row = self.row_for(exit_id)?;
        if row.forward == exit_id {
            row.reverse
        } else {
            Some(row.forward)
        }
    }
}

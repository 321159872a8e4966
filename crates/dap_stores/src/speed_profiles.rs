use std::{collections::BTreeMap, io::BufReader, path::Path};

use async_trait::async_trait;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;

/// OSM highway classes a speed profile may override.
pub const ROAD_CLASSES: [&str; 23] = [
    "primary",
    "primary_link",
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "road",
    "unclassified",
    "residential",
    "service",
    "living_street",
    "path",
    "track",
    "cycleway",
    "footway",
    "pedestrian",
    "crossing",
    "steps",
    "construction",
];

/// OSM surface values a speed profile may override.
pub const SURFACE_CLASSES: [&str; 30] = [
    "paved",
    "unpaved",
    "asphalt",
    "concrete",
    "concrete:lanes",
    "concrete:plates",
    "paving_stones",
    "paving_stones:20",
    "paving_stones:30",
    "paving_stones:50",
    "paved_stones",
    "cobblestone:flattened",
    "sett",
    "cobblestone",
    "metal",
    "wood",
    "compacted",
    "pebblestone",
    "fine_gravel",
    "gravel",
    "dirt",
    "ground",
    "earth",
    "mud",
    "ice",
    "snow",
    "sand",
    "woodchips",
    "grass",
    "grass_paver",
];

fn default_unit() -> String {
    String::from("kmh")
}

/// Road and surface speed overrides, forwarded to ORS as `user_speed_limits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedProfileContent {
    #[serde(default = "default_unit")]
    pub unit: String,

    #[serde(
        rename = "roadSpeeds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub road_speeds: Option<BTreeMap<String, u32>>,

    #[serde(
        rename = "surfaceSpeeds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub surface_speeds: Option<BTreeMap<String, u32>>,
}

impl SpeedProfileContent {
    /// `(field, key)` pairs for every class that is not a known OSM value.
    pub fn unknown_classes(&self) -> Vec<(&'static str, String)> {
        fn unknown<'a>(
            field: &'static str,
            speeds: &'a Option<BTreeMap<String, u32>>,
            known: &'a [&'static str],
        ) -> impl Iterator<Item = (&'static str, String)> + 'a {
            speeds
                .iter()
                .flat_map(|speeds| speeds.keys())
                .filter(move |key| !known.contains(&key.as_str()))
                .map(move |key| (field, key.clone()))
        }

        unknown("roadSpeeds", &self.road_speeds, &ROAD_CLASSES)
            .chain(unknown("surfaceSpeeds", &self.surface_speeds, &SURFACE_CLASSES))
            .collect()
    }
}

#[async_trait]
pub trait SpeedProfileStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<SpeedProfileContent>, StoreError>;
}

#[derive(Default)]
pub struct InMemorySpeedProfileStore {
    profiles: FxHashMap<i64, SpeedProfileContent>,
}

impl InMemorySpeedProfileStore {
    pub fn new(profiles: impl IntoIterator<Item = (i64, SpeedProfileContent)>) -> Self {
        InMemorySpeedProfileStore {
            profiles: profiles.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Reads `{ "<id>": <content>, ... }`.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let file = std::fs::File::open(path)?;
        let raw: BTreeMap<String, SpeedProfileContent> =
            serde_json::from_reader(BufReader::new(file))?;

        let mut profiles = FxHashMap::default();
        for (id, content) in raw {
            let invalid = |reason: String| StoreError::InvalidSpeedProfile {
                id: id.clone(),
                reason,
            };

            let parsed_id = id
                .parse::<i64>()
                .map_err(|_| invalid("id is not an integer".to_owned()))?;

            if let Some((field, key)) = content.unknown_classes().into_iter().next() {
                return Err(invalid(format!("unknown {} class '{}'", field, key)));
            }

            profiles.insert(parsed_id, content);
        }

        info!(
            "Loaded {} speed profiles from {}",
            profiles.len(),
            path.display()
        );

        Ok(InMemorySpeedProfileStore { profiles })
    }
}

#[async_trait]
impl SpeedProfileStore for InMemorySpeedProfileStore {
    async fn get(&self, id: i64) -> Result<Option<SpeedProfileContent>, StoreError> {
        Ok(self.profiles.get(&id).cloned())
    }
}

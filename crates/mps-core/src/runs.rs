//! Typed Mythic+ run statistics

use crate::value::serialize_number;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Runs of one state bucket, keyed by run id
pub type StateRuns = BTreeMap<i64, Run>;
/// State buckets of one keystone level
pub type LevelStates = BTreeMap<String, StateRuns>;
/// Keystone levels of one map
pub type MapLevels = BTreeMap<i64, LevelStates>;

/// All runs, keyed `mapId -> keyLevel -> state -> runId`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RunsById {
    maps: BTreeMap<i64, MapLevels>,
}

impl RunsById {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_maps(maps: BTreeMap<i64, MapLevels>) -> Self {
        Self { maps }
    }

    pub fn maps(&self) -> &BTreeMap<i64, MapLevels> {
        &self.maps
    }

    pub fn map(&self, map_id: i64) -> Option<&MapLevels> {
        self.maps.get(&map_id)
    }

    pub fn map_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.maps.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Look up a single run by its full coordinate
    pub fn get(&self, map_id: i64, key_level: i64, state: &str, run_id: i64) -> Option<&Run> {
        self.maps
            .get(&map_id)?
            .get(&key_level)?
            .get(state)?
            .get(&run_id)
    }

    /// Insert a run, creating intermediate levels as needed. Returns the
    /// run previously stored at that coordinate, if any.
    pub fn insert(&mut self, coord: RunCoord, run: Run) -> Option<Run> {
        self.maps
            .entry(coord.map_id)
            .or_default()
            .entry(coord.key_level)
            .or_default()
            .entry(coord.state)
            .or_default()
            .insert(coord.run_id, run)
    }

    /// Every run with its coordinate, in key order
    pub fn runs(&self) -> impl Iterator<Item = (RunCoord, &Run)> + '_ {
        self.maps.iter().flat_map(|(map_id, levels)| {
            levels.iter().flat_map(move |(key_level, states)| {
                states.iter().flat_map(move |(state, runs)| {
                    runs.iter().map(move |(run_id, run)| {
                        (
                            RunCoord {
                                map_id: *map_id,
                                key_level: *key_level,
                                state: state.clone(),
                                run_id: *run_id,
                            },
                            run,
                        )
                    })
                })
            })
        })
    }

    /// Total number of runs across all maps
    pub fn run_count(&self) -> usize {
        self.maps
            .values()
            .flat_map(|levels| levels.values())
            .flat_map(|states| states.values())
            .map(|runs| runs.len())
            .sum()
    }
}

/// Location of a run inside `RunsById`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunCoord {
    pub map_id: i64,
    pub key_level: i64,
    pub state: String,
    pub run_id: i64,
}

impl RunCoord {
    pub fn new(map_id: i64, key_level: i64, state: impl Into<String>, run_id: i64) -> Self {
        Self {
            map_id,
            key_level,
            state: state.into(),
            run_id,
        }
    }
}

impl fmt::Display for RunCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map {} +{} {} #{}",
            self.map_id, self.key_level, self.state, self.run_id
        )
    }
}

/// A leaf value of a run or encounter field
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Boolean(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => serialize_number(*n, serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

/// One boss or event inside a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EncounterRecord {
    pub fields: BTreeMap<String, Scalar>,
}

impl EncounterRecord {
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }
}

/// A run field: a scalar, or the list under `encounters`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunField {
    Scalar(Scalar),
    Encounters(Vec<EncounterRecord>),
}

impl RunField {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            RunField::Scalar(s) => Some(s),
            RunField::Encounters(_) => None,
        }
    }
}

/// One dungeon attempt. The run id is the key it is stored under and is not
/// repeated among the fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Run {
    pub fields: BTreeMap<String, RunField>,
}

impl Run {
    pub fn get(&self, name: &str) -> Option<&RunField> {
        self.fields.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        self.get(name).and_then(RunField::as_scalar)
    }

    /// Encounters of this run; empty when the field is absent
    pub fn encounters(&self) -> &[EncounterRecord] {
        match self.fields.get(crate::projector::ENCOUNTERS_FIELD) {
            Some(RunField::Encounters(list)) => list,
            _ => &[],
        }
    }

    /// Names of the scalar fields, in order
    pub fn scalar_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields
            .iter()
            .filter(|(_, v)| matches!(v, RunField::Scalar(_)))
            .map(|(k, _)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with_score(score: f64) -> Run {
        let mut run = Run::default();
        run.fields
            .insert("score".to_string(), RunField::Scalar(Scalar::Number(score)));
        run
    }

    #[test]
    fn test_insert_and_get() {
        let mut runs = RunsById::new();
        assert!(runs.is_empty());

        runs.insert(RunCoord::new(2, 10, "success", 1001), run_with_score(320.5));
        runs.insert(RunCoord::new(2, 12, "failed", 1002), run_with_score(0.0));

        let run = runs.get(2, 10, "success", 1001).unwrap();
        assert_eq!(run.scalar("score"), Some(&Scalar::Number(320.5)));
        assert!(runs.get(2, 10, "failed", 1001).is_none());
        assert_eq!(runs.run_count(), 2);
        assert_eq!(runs.map_ids().collect::<Vec<_>>(), vec![2]);
        assert_eq!(runs.map(2).unwrap().len(), 2);
    }

    #[test]
    fn test_insert_replaces_existing_run() {
        let mut runs = RunsById::new();
        assert!(runs
            .insert(RunCoord::new(1, 2, "success", 3), run_with_score(1.0))
            .is_none());
        let previous = runs.insert(RunCoord::new(1, 2, "success", 3), run_with_score(2.0));
        assert_eq!(previous, Some(run_with_score(1.0)));
        assert_eq!(runs.run_count(), 1);
    }

    #[test]
    fn test_runs_iterate_in_key_order() {
        let mut runs = RunsById::new();
        runs.insert(RunCoord::new(9, 2, "success", 1), Run::default());
        runs.insert(RunCoord::new(2, 15, "success", 7), Run::default());
        runs.insert(RunCoord::new(2, 3, "abandoned", 8), Run::default());

        let coords: Vec<String> = runs.runs().map(|(c, _)| c.to_string()).collect();
        assert_eq!(
            coords,
            vec![
                "map 2 +3 abandoned #8",
                "map 2 +15 success #7",
                "map 9 +2 success #1"
            ]
        );
    }

    #[test]
    fn test_encounters_default_to_empty() {
        let run = run_with_score(1.0);
        assert!(run.encounters().is_empty());
        assert_eq!(run.scalar_names().collect::<Vec<_>>(), vec!["score"]);
    }

    #[test]
    fn test_serialize_nested_json() {
        let mut run = run_with_score(320.5);
        let mut encounter = EncounterRecord::default();
        encounter
            .fields
            .insert("name".to_string(), Scalar::String("Boss A".to_string()));
        encounter
            .fields
            .insert("kills".to_string(), Scalar::Number(1.0));
        run.fields.insert(
            "encounters".to_string(),
            RunField::Encounters(vec![encounter]),
        );

        let mut runs = RunsById::new();
        runs.insert(RunCoord::new(2, 10, "success", 1001), run);

        let json = serde_json::to_value(&runs).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "2": {"10": {"success": {"1001": {
                    "score": 320.5,
                    "encounters": [{"name": "Boss A", "kills": 1}]
                }}}}
            })
        );
    }
}

//! Projection of the parsed table onto the run schema
//!
//! The walk has a fixed depth, each level with its own expectation:
//!
//! 1. root: a table, optionally wrapping the map table under `outer_key`
//! 2. `mapId`: integer keys, table values
//! 3. `keyLevel`: integer keys, table values
//! 4. `state`: string keys, values are lists of run tables
//! 5. run: named scalar fields, plus `encounters` as a list of flat tables
//!
//! Any deviation is a [`ShapeError`] carrying the path of the offending table.

use crate::error::ShapeError;
use crate::path::{KeyPath, PathSegment};
use crate::runs::{EncounterRecord, LevelStates, MapLevels, Run, RunField, RunsById, Scalar, StateRuns};
use crate::value::{Field, Key, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Default name of the field wrapping all map data
pub const DEFAULT_OUTER_KEY: &str = "runsById";
/// Default name of the field holding a run's id
pub const DEFAULT_RUN_ID_FIELD: &str = "runId";
/// Run field holding the list of encounters
pub const ENCOUNTERS_FIELD: &str = "encounters";

/// How to treat a key that appears twice in the same table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the later value, like a Lua table constructor
    #[default]
    LastWins,
    /// Fail with a `ShapeError`
    Reject,
}

/// Options for [`project_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Root field holding the map table; when absent from the input the root
    /// table itself is the map table
    pub outer_key: Option<String>,
    pub run_id_field: String,
    pub duplicates: DuplicatePolicy,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            outer_key: Some(DEFAULT_OUTER_KEY.to_string()),
            run_id_field: DEFAULT_RUN_ID_FIELD.to_string(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl ProjectOptions {
    /// Default options with duplicate keys rejected
    pub fn strict() -> Self {
        Self {
            duplicates: DuplicatePolicy::Reject,
            ..Self::default()
        }
    }
}

/// Project with default options
pub fn project(root: &Value) -> Result<RunsById, ShapeError> {
    project_with(root, &ProjectOptions::default())
}

/// Project the right-hand side table of the SavedVariables assignment
pub fn project_with(root: &Value, options: &ProjectOptions) -> Result<RunsById, ShapeError> {
    Projector { options }.project(root)
}

struct Projector<'a> {
    options: &'a ProjectOptions,
}

impl Projector<'_> {
    fn project(&self, root: &Value) -> Result<RunsById, ShapeError> {
        let root_fields = expect_table(root, &KeyPath::root(), "root table")?;
        let (maps_value, maps_path) = match self.outer_field(root_fields)? {
            Some(found) => found,
            None => (root, KeyPath::root()),
        };

        let mut maps = BTreeMap::new();
        for field in expect_table(maps_value, &maps_path, "table of maps")? {
            let path = maps_path.child(PathSegment::MapId(field.key.clone()));
            let map_id = integer_key(&field.key, &path, "integer mapId")?;
            let levels = self.project_levels(&field.value, &path)?;
            self.insert(&mut maps, map_id, levels, &path)?;
        }

        Ok(RunsById::from_maps(maps))
    }

    /// Find the outer field in the root table, honouring the duplicate policy
    fn outer_field<'v>(
        &self,
        root_fields: &'v [Field],
    ) -> Result<Option<(&'v Value, KeyPath)>, ShapeError> {
        let Some(outer) = self.options.outer_key.as_deref() else {
            return Ok(None);
        };
        let path = KeyPath::root().child(PathSegment::Outer(outer.to_string()));

        let mut found = None;
        for field in root_fields {
            if field.key.as_str() == Some(outer) {
                if found.is_some() {
                    self.duplicate(&path)?;
                }
                found = Some(&field.value);
            }
        }
        Ok(found.map(|value| (value, path)))
    }

    fn project_levels(&self, value: &Value, path: &KeyPath) -> Result<MapLevels, ShapeError> {
        let mut levels = BTreeMap::new();
        for field in expect_table(value, path, "table of key levels")? {
            let level_path = path.child(PathSegment::KeyLevel(field.key.clone()));
            let key_level = integer_key(&field.key, &level_path, "integer keyLevel")?;
            let states = self.project_states(&field.value, &level_path)?;
            self.insert(&mut levels, key_level, states, &level_path)?;
        }
        Ok(levels)
    }

    fn project_states(&self, value: &Value, path: &KeyPath) -> Result<LevelStates, ShapeError> {
        let mut states = BTreeMap::new();
        for field in expect_table(value, path, "table of run states")? {
            let state_path = path.child(PathSegment::State(field.key.clone()));
            let state = match &field.key {
                Key::String(s) => s.clone(),
                other => return Err(ShapeError::new(state_path, "string state key", other.describe())),
            };
            let runs = self.project_runs(&field.value, &state_path)?;
            self.insert(&mut states, state, runs, &state_path)?;
        }
        Ok(states)
    }

    /// A state bucket is a positional list of run tables; each run's id comes
    /// from a field inside it. A repeated slot key replaces the run stored
    /// from the earlier slot.
    fn project_runs(&self, value: &Value, path: &KeyPath) -> Result<StateRuns, ShapeError> {
        let mut runs = BTreeMap::new();
        // slot -> run id stored from it, and run id -> slot that stored it
        let mut slots: BTreeMap<i64, i64> = BTreeMap::new();
        let mut owners: BTreeMap<i64, i64> = BTreeMap::new();

        for (i, entry) in expect_table(value, path, "list of runs")?.iter().enumerate() {
            let run_path = path.child(PathSegment::Run(i + 1));
            let Key::Index(slot) = entry.key else {
                return Err(ShapeError::new(run_path, "positional run entry", entry.key.describe()));
            };
            let (run_id, run) = self.project_run(&entry.value, &run_path)?;

            if let Some(earlier) = slots.insert(slot, run_id) {
                self.duplicate(&run_path)?;
                if owners.get(&earlier) == Some(&slot) {
                    runs.remove(&earlier);
                }
            }
            owners.insert(run_id, slot);
            self.insert(&mut runs, run_id, run, &run_path)?;
        }
        Ok(runs)
    }

    fn project_run(&self, value: &Value, path: &KeyPath) -> Result<(i64, Run), ShapeError> {
        let id_field = self.options.run_id_field.as_str();
        let mut run_id = None;
        let mut run = Run::default();

        for field in expect_table(value, path, "run table")? {
            let name = field_name(field, path, "named run field")?;
            let field_path = path.child(PathSegment::Field(name.to_string()));

            if name == id_field {
                let id = field.value.as_integer().ok_or_else(|| {
                    ShapeError::new(field_path.clone(), "integer run id", field.value.describe())
                })?;
                if run_id.replace(id).is_some() {
                    self.duplicate(&field_path)?;
                }
                continue;
            }

            let projected = if name == ENCOUNTERS_FIELD {
                RunField::Encounters(self.project_encounters(&field.value, &field_path)?)
            } else {
                RunField::Scalar(scalar(&field.value, &field_path)?)
            };
            self.insert(&mut run.fields, name.to_string(), projected, &field_path)?;
        }

        let run_id = run_id.ok_or_else(|| {
            ShapeError::new(path.clone(), format!("`{}` field", id_field), "run table without one")
        })?;
        Ok((run_id, run))
    }

    /// Encounters keep the order in which their slots first appear
    fn project_encounters(
        &self,
        value: &Value,
        path: &KeyPath,
    ) -> Result<Vec<EncounterRecord>, ShapeError> {
        let mut records: Vec<EncounterRecord> = Vec::new();
        let mut positions: BTreeMap<i64, usize> = BTreeMap::new();

        for (i, entry) in expect_table(value, path, "list of encounter tables")?.iter().enumerate() {
            let encounter_path = path.child(PathSegment::Encounter(i + 1));
            let Key::Index(slot) = entry.key else {
                return Err(ShapeError::new(
                    encounter_path,
                    "positional encounter entry",
                    entry.key.describe(),
                ));
            };
            let record = self.project_encounter(&entry.value, &encounter_path)?;

            match positions.get(&slot) {
                Some(&position) => {
                    self.duplicate(&encounter_path)?;
                    records[position] = record;
                }
                None => {
                    positions.insert(slot, records.len());
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    fn project_encounter(&self, value: &Value, path: &KeyPath) -> Result<EncounterRecord, ShapeError> {
        let mut record = EncounterRecord::default();
        for field in expect_table(value, path, "encounter table")? {
            let name = field_name(field, path, "named encounter field")?;
            let field_path = path.child(PathSegment::Field(name.to_string()));
            let value = scalar(&field.value, &field_path)?;
            self.insert(&mut record.fields, name.to_string(), value, &field_path)?;
        }
        Ok(record)
    }

    fn insert<K: Ord, V>(
        &self,
        map: &mut BTreeMap<K, V>,
        key: K,
        value: V,
        path: &KeyPath,
    ) -> Result<(), ShapeError> {
        if map.insert(key, value).is_some() {
            self.duplicate(path)?;
        }
        Ok(())
    }

    fn duplicate(&self, path: &KeyPath) -> Result<(), ShapeError> {
        match self.options.duplicates {
            DuplicatePolicy::LastWins => {
                debug!(%path, "duplicate key, keeping the later value");
                Ok(())
            }
            DuplicatePolicy::Reject => Err(ShapeError::duplicate(path.clone())),
        }
    }
}

fn expect_table<'v>(value: &'v Value, path: &KeyPath, expected: &str) -> Result<&'v [Field], ShapeError> {
    value
        .as_table()
        .ok_or_else(|| ShapeError::new(path.clone(), expected, value.describe()))
}

fn integer_key(key: &Key, path: &KeyPath, expected: &str) -> Result<i64, ShapeError> {
    key.as_integer()
        .ok_or_else(|| ShapeError::new(path.clone(), expected, key.describe()))
}

fn field_name<'v>(field: &'v Field, path: &KeyPath, expected: &str) -> Result<&'v str, ShapeError> {
    field
        .key
        .as_str()
        .ok_or_else(|| ShapeError::new(path.clone(), expected, field.key.describe()))
}

fn scalar(value: &Value, path: &KeyPath) -> Result<Scalar, ShapeError> {
    match value {
        Value::Boolean(b) => Ok(Scalar::Boolean(*b)),
        Value::Number(n) => Ok(Scalar::Number(*n)),
        Value::String(s) => Ok(Scalar::String(s.clone())),
        Value::Nil | Value::Table(_) => Err(ShapeError::new(
            path.clone(),
            "number, string or boolean",
            value.describe(),
        )),
    }
}

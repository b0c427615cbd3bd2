//! mps-core: Core library for reading Mythic+ Stats SavedVariables
//!
//! This library provides functionality to:
//! - Parse the addon's `MythicPlusStatsDB = { ... }` literal table into a generic tree
//! - Project that tree onto typed run statistics (`mapId -> keyLevel -> state -> runId`)
//! - Locate SavedVariables files under a World of Warcraft install
//! - Export projected runs as JSON or CSV

pub mod config;
pub mod error;
pub mod export;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod projector;
pub mod runs;
pub mod scanner;
pub mod source;
pub mod value;

pub use config::IngestConfig;
pub use error::{Error, ParseError, Result, ShapeError, SourceError};
pub use export::{write_csv, write_json};
pub use parser::{parse, parse_assignment, Assignment};
pub use path::{KeyPath, PathSegment};
pub use projector::{project, project_with, DuplicatePolicy, ProjectOptions};
pub use runs::{EncounterRecord, Run, RunCoord, RunField, RunsById, Scalar};
pub use scanner::{find_saved_variables, SavedVariablesFile};
pub use source::{ingest, ingest_str, prescreen, FileSource, SourceProvider, TextSource};
pub use value::{Field, Key, Value};

//! Source providers and the end-to-end ingestion pipeline
//!
//! A provider hands over the complete file text (or fails) before any parsing
//! happens. The pipeline is then: pre-screen, parse, project.

use crate::config::IngestConfig;
use crate::error::{Error, Result, SourceError};
use crate::parser::parse_assignment;
use crate::projector::project_with;
use crate::runs::RunsById;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Something that yields the raw SavedVariables text
pub trait SourceProvider {
    fn read(&mut self) -> std::result::Result<String, SourceError>;
}

/// Reads a file chosen by the caller; no path means nothing was selected
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    path: Option<PathBuf>,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    pub fn unselected() -> Self {
        Self::default()
    }
}

impl SourceProvider for FileSource {
    fn read(&mut self) -> std::result::Result<String, SourceError> {
        let path = self.path.as_ref().ok_or(SourceError::NotSelected)?;
        fs::read_to_string(path).map_err(|e| SourceError::ReadFailed {
            path: path.clone(),
            source: e,
        })
    }
}

/// Text already held in memory
#[derive(Debug, Clone)]
pub struct TextSource(pub String);

impl SourceProvider for TextSource {
    fn read(&mut self) -> std::result::Result<String, SourceError> {
        Ok(self.0.clone())
    }
}

/// Reject text that does not mention the expected identifier
pub fn prescreen(text: &str, identifier: &str) -> Result<()> {
    if text.contains(identifier) {
        Ok(())
    } else {
        Err(Error::NotRecognizedFormat {
            identifier: identifier.to_string(),
        })
    }
}

/// Read from `provider`, then pre-screen, parse and project
pub fn ingest<S: SourceProvider + ?Sized>(provider: &mut S, config: &IngestConfig) -> Result<RunsById> {
    let text = provider.read()?;
    ingest_str(&text, config)
}

/// Pre-screen, parse and project text that is already in memory
pub fn ingest_str(text: &str, config: &IngestConfig) -> Result<RunsById> {
    prescreen(text, &config.identifier)?;

    let assignment = parse_assignment(text)?;
    debug!(name = %assignment.name, bytes = text.len(), "parsed SavedVariables table");

    let runs = project_with(&assignment.value, &config.project_options())?;
    debug!(runs = runs.run_count(), "projected run statistics");
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runs::Scalar;
    use std::io::Write;

    const SAMPLE: &str = r#"MythicPlusStatsDB = {
	["runsById"] = {
		[2] = {
			[10] = {
				["success"] = {
					{
						["runId"] = 1001,
						["score"] = 320.5,
					}, -- [1]
				},
			},
		},
	},
}
"#;

    #[test]
    fn test_ingest_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let mut source = FileSource::new(file.path());
        let runs = ingest(&mut source, &IngestConfig::default()).unwrap();
        assert_eq!(
            runs.get(2, 10, "success", 1001).unwrap().scalar("score"),
            Some(&Scalar::Number(320.5))
        );
    }

    #[test]
    fn test_not_selected() {
        let err = ingest(&mut FileSource::unselected(), &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::NotSelected)));
    }

    #[test]
    fn test_read_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FileSource::new(dir.path().join("missing.lua"));
        let err = ingest(&mut source, &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::ReadFailed { .. })));
    }

    #[test]
    fn test_not_recognized_format() {
        let mut source = TextSource("OtherAddonDB = {}".to_string());
        let err = ingest(&mut source, &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotRecognizedFormat { .. }));
    }

    #[test]
    fn test_parse_and_shape_errors_are_distinct() {
        let err = ingest_str("MythicPlusStatsDB = { [1] = ", &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let err = ingest_str("MythicPlusStatsDB = { [1] = 2 }", &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn test_provider_as_trait_object() {
        let mut source: Box<dyn SourceProvider> = Box::new(TextSource(SAMPLE.to_string()));
        let runs = ingest(source.as_mut(), &IngestConfig::default()).unwrap();
        assert_eq!(runs.run_count(), 1);
    }
}

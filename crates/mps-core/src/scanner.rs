//! Directory scanner for locating the addon's SavedVariables files
//!
//! The addon writes to
//! `World of Warcraft/_retail_/WTF/Account/<ACCOUNT>/SavedVariables/MythicPlusStats.lua`,
//! one file per account.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A SavedVariables file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedVariablesFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Account directory name, when the path goes through `WTF/Account/<name>`
    pub account: Option<String>,
}

/// Walk `roots` for files named `file_name` (ASCII case-insensitive), sorted by path
pub fn find_saved_variables<P: AsRef<Path>>(roots: &[P], file_name: &str) -> Result<Vec<SavedVariablesFile>> {
    let mut found = Vec::new();

    for root in roots {
        for entry in WalkDir::new(root.as_ref()).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(file_name));
            if matches {
                let path = entry.into_path();
                let account = account_name(&path);
                found.push(SavedVariablesFile { path, account });
            }
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    found.dedup_by(|a, b| a.path == b.path);
    Ok(found)
}

/// Extract the account name from `.../Account/<name>/...`
fn account_name(path: &Path) -> Option<String> {
    let parts: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    parts
        .windows(2)
        .rev()
        .find(|w| w[0].eq_ignore_ascii_case("Account"))
        .map(|w| w[1].to_string())
        // The file itself is never the account
        .filter(|name| path.file_name().and_then(|f| f.to_str()) != Some(name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "MythicPlusStatsDB = {}").unwrap();
    }

    #[test]
    fn test_account_name() {
        let path = Path::new("/games/WoW/_retail_/WTF/Account/PLAYER#1/SavedVariables/MythicPlusStats.lua");
        assert_eq!(account_name(path), Some("PLAYER#1".to_string()));
        assert_eq!(account_name(Path::new("/tmp/MythicPlusStats.lua")), None);
        assert_eq!(account_name(Path::new("/tmp/Account/MythicPlusStats.lua")), None);
    }

    #[test]
    fn test_find_saved_variables() {
        let dir = tempfile::tempdir().unwrap();
        let wtf = dir.path().join("_retail_").join("WTF").join("Account");
        touch(&wtf.join("ALPHA").join("SavedVariables").join("MythicPlusStats.lua"));
        touch(&wtf.join("BETA").join("SavedVariables").join("mythicplusstats.lua"));
        touch(&wtf.join("BETA").join("SavedVariables").join("OtherAddon.lua"));

        let found = find_saved_variables(&[dir.path()], "MythicPlusStats.lua").unwrap();
        let accounts: Vec<Option<String>> = found.iter().map(|f| f.account.clone()).collect();
        assert_eq!(
            accounts,
            vec![Some("ALPHA".to_string()), Some("BETA".to_string())]
        );
    }

    #[test]
    fn test_overlapping_roots_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("SavedVariables");
        touch(&nested.join("MythicPlusStats.lua"));

        let found = find_saved_variables(&[dir.path(), nested.as_path()], "MythicPlusStats.lua").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(find_saved_variables(&[missing], "MythicPlusStats.lua").is_err());
    }
}

//! JSON and CSV export of projected runs

use crate::error::Result;
use crate::runs::{RunField, RunsById};
use std::collections::BTreeSet;
use std::io::Write;

/// Fixed leading CSV columns identifying a run
pub const COORD_COLUMNS: [&str; 4] = ["map_id", "key_level", "state", "run_id"];

/// Write runs as pretty-printed nested JSON
pub fn write_json<W: Write>(runs: &RunsById, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, runs)?;
    writeln!(writer)?;
    Ok(())
}

/// Header for a run field; names taken by the coordinate columns get a
/// `field_` prefix
fn field_column(name: &str) -> String {
    if COORD_COLUMNS.contains(&name) {
        format!("field_{}", name)
    } else {
        name.to_string()
    }
}

/// Write one CSV row per run.
///
/// Columns are the run coordinate, then every scalar field name seen in any
/// run (sorted), then `encounters` holding the encounter count.
pub fn write_csv<W: Write>(runs: &RunsById, writer: W) -> Result<usize> {
    let field_names: BTreeSet<&str> = runs.runs().flat_map(|(_, run)| run.scalar_names()).collect();

    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = COORD_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(field_names.iter().map(|name| field_column(name)));
    header.push("encounters".to_string());
    csv_writer.write_record(&header)?;

    let mut rows = 0;
    for (coord, run) in runs.runs() {
        let mut record = vec![
            coord.map_id.to_string(),
            coord.key_level.to_string(),
            coord.state.clone(),
            coord.run_id.to_string(),
        ];
        for name in &field_names {
            let cell = match run.get(name) {
                Some(RunField::Scalar(value)) => value.to_string(),
                _ => String::new(),
            };
            record.push(cell);
        }
        record.push(run.encounters().len().to_string());
        csv_writer.write_record(&record)?;
        rows += 1;
    }

    csv_writer.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::projector::project;

    fn sample() -> RunsById {
        let src = r#"local MythicPlusStatsDB = { [2] = { [10] = { ["success"] = {
            { ["runId"] = 1001, ["score"] = 320.5, ["encounters"] = { { ["name"] = "Boss A" }, { ["name"] = "Boss B" } } },
            { ["runId"] = 1002, ["zone"] = "Halls, of \"Valor\"" },
        } } } }"#;
        project(&parse(src).unwrap()).unwrap()
    }

    #[test]
    fn test_write_csv() {
        let mut out = Vec::new();
        let rows = write_csv(&sample(), &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "map_id,key_level,state,run_id,score,zone,encounters");
        assert_eq!(lines[1], "2,10,success,1001,320.5,,2");
        assert_eq!(lines[2], r#"2,10,success,1002,,"Halls, of ""Valor""",0"#);
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_json(&sample(), &mut out).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["2"]["10"]["success"]["1001"]["score"], 320.5);
        assert_eq!(
            json["2"]["10"]["success"]["1001"]["encounters"][1]["name"],
            "Boss B"
        );
    }

    #[test]
    fn test_write_csv_empty() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&RunsById::new(), &mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "map_id,key_level,state,run_id,encounters\n"
        );
    }

    #[test]
    fn test_write_csv_prefixes_colliding_field_names() {
        let src = r#"local MythicPlusStatsDB = { [2] = { [10] = { ["success"] = {
            { ["runId"] = 1001, ["state"] = "timed", ["map_id"] = 99 },
        } } } }"#;
        let runs = project(&parse(src).unwrap()).unwrap();

        let mut out = Vec::new();
        write_csv(&runs, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "map_id,key_level,state,run_id,field_map_id,field_state,encounters"
        );
        assert_eq!(lines[1], "2,10,success,1001,99,timed,0");
    }
}

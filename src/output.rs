//! Writers for the normalized `<dataset>.json` and `<dataset>.txt` files.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::normalization::NormalizedRecord;

/// Record terminator used by the text export in place of a newline.
pub const TXT_TERMINATOR: &str = "||";

/// Pretty JSON array with two-space indentation; non-ASCII is written as-is.
pub fn save_json(records: &[NormalizedRecord], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "saved JSON");
    Ok(())
}

/// CSV-quoted header and rows, each terminated by `||` instead of a newline.
pub fn save_txt(records: &[NormalizedRecord], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&encode_txt_line(&NormalizedRecord::FIELDS)?)?;
    for record in records {
        writer.write_all(&encode_txt_line(&record.text_fields())?)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "saved TXT");
    Ok(())
}

fn encode_txt_line<I, T>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(fields)?;
    let mut line = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush text record: {}", e.error()))?;
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    line.extend_from_slice(TXT_TERMINATOR.as_bytes());
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<NormalizedRecord> {
        vec![
            NormalizedRecord {
                identifier: "42083-1".into(),
                name: "Bugatti Chiron".into(),
                year: Some(2018),
                num_parts: Some(3599),
                image: "https://img/42083-1.jpg".into(),
                theme: "Technic Model".into(),
                parent_theme: "Technic".into(),
            },
            NormalizedRecord {
                identifier: "fig-000001".into(),
                name: "Toy Story, Woody".into(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn txt_uses_pipe_terminators_and_fixed_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sets.txt");
        save_txt(&sample(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "identifier,name,year,num_parts,image,theme,parent_theme||\
             42083-1,Bugatti Chiron,2018,3599,https://img/42083-1.jpg,Technic Model,Technic||\
             fig-000001,\"Toy Story, Woody\",,,,,||"
        );
        assert!(!text.contains('\n'));
    }

    #[test]
    fn json_keeps_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sets.json");
        save_json(&sample(), &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let second = &value[1];
        assert_eq!(second["identifier"], "fig-000001");
        assert!(second["year"].is_null());
        assert_eq!(second["theme"], "");
        assert_eq!(second.as_object().unwrap().len(), 7);
    }
}

//! Scientific structure (PDB) conversion.
//!
//! PDB coordinate records are fixed-column: atom name in columns 13–16,
//! x/y/z in columns 31–54. As a representative computation the handler
//! reports the first two atoms and their Euclidean distance, enough to
//! prove the structure parsed and to answer the common "how far apart"
//! questions directly.

use async_trait::async_trait;
use std::path::Path;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::{ConvertOptions, DocumentConverter};

pub struct PdbConverter;

#[derive(Debug, Clone, PartialEq)]
struct Atom {
    name: String,
    x: f64,
    y: f64,
    z: f64,
}

#[async_trait]
impl DocumentConverter for PdbConverter {
    fn name(&self) -> &'static str {
        "pdb"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        if opts.extension.as_deref() != Some(".pdb") {
            return Ok(None);
        }
        let bytes = std::fs::read(source)?;
        let text = String::from_utf8_lossy(&bytes);

        let mut atoms = Vec::with_capacity(2);
        for line in text.lines() {
            if let Some(atom) = parse_atom_record(line)? {
                atoms.push(atom);
                if atoms.len() == 2 {
                    break;
                }
            }
        }

        if atoms.len() < 2 {
            return Err(ConverterError::Parse(
                "PDB file contains fewer than two atoms".into(),
            ));
        }

        let (first, second) = (&atoms[0], &atoms[1]);
        let distance = euclidean_distance(first, second);
        let content = format!(
            "First atom: {} ({:.3}, {:.3}, {:.3})\n\
             Second atom: {} ({:.3}, {:.3}, {:.3})\n\
             Distance_Å: {distance:.3} Angstroms (Å)",
            first.name, first.x, first.y, first.z, second.name, second.x, second.y, second.z,
        );
        Ok(Some(ConversionResult::with_text(content)))
    }
}

/// Parse an `ATOM`/`HETATM` record; `Ok(None)` for any other record type.
fn parse_atom_record(line: &str) -> Result<Option<Atom>, ConverterError> {
    if !line.starts_with("ATOM") && !line.starts_with("HETATM") {
        return Ok(None);
    }
    let field = |from: usize, to: usize| -> Result<&str, ConverterError> {
        line.get(from..to)
            .map(str::trim)
            .ok_or_else(|| ConverterError::Parse(format!("truncated atom record: {line:?}")))
    };
    let coord = |from: usize, to: usize| -> Result<f64, ConverterError> {
        field(from, to)?
            .parse()
            .map_err(|_| ConverterError::Parse(format!("bad coordinate in record: {line:?}")))
    };
    Ok(Some(Atom {
        name: field(12, 16)?.to_string(),
        x: coord(30, 38)?,
        y: coord(38, 46)?,
        z: coord(46, 54)?,
    }))
}

fn euclidean_distance(a: &Atom, b: &Atom) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, serial: u32, x: f64, y: f64, z: f64) -> String {
        format!(
            "ATOM  {serial:>5} {name:<4}GLY A   1     {x:>8.3}{y:>8.3}{z:>8.3}  1.00  0.00           N",
        )
    }

    fn pdb_opts() -> ConvertOptions {
        ConvertOptions {
            extension: Some(".pdb".into()),
            ..Default::default()
        }
    }

    async fn run(content: String) -> Result<Option<ConversionResult>, ConverterError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.pdb");
        std::fs::write(&path, content).unwrap();
        PdbConverter
            .convert(&path, &ConversionConfig::default(), &pdb_opts())
            .await
    }

    #[tokio::test]
    async fn reports_three_four_five_distance() {
        let content = format!(
            "HEADER    TEST\n{}\n{}\n",
            record("N", 1, 0.0, 0.0, 0.0),
            record("CA", 2, 3.0, 4.0, 0.0)
        );
        let result = run(content).await.unwrap().unwrap();
        assert!(result.text_content.contains("First atom: N"));
        assert!(result.text_content.contains("Second atom: CA"));
        assert!(
            result.text_content.contains("Distance_Å: 5.000"),
            "got: {}",
            result.text_content
        );
    }

    #[tokio::test]
    async fn fewer_than_two_atoms_is_a_clear_failure() {
        let content = format!("HEADER    TEST\n{}\n", record("N", 1, 0.0, 0.0, 0.0));
        let err = run(content).await.unwrap_err();
        assert!(err.to_string().contains("fewer than two atoms"));
    }

    #[tokio::test]
    async fn hetatm_records_count_as_atoms() {
        let content = format!(
            "{}\nHETATM    2  O   HOH A   2       1.000   0.000   0.000  1.00  0.00           O\n",
            record("N", 1, 0.0, 0.0, 0.0)
        );
        let result = run(content).await.unwrap().unwrap();
        assert!(result.text_content.contains("Distance_Å: 1.000"));
    }
}

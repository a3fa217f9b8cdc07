//! Fleet sheet ingestion: header resolution and row extraction.

use std::collections::HashMap;

use fleetwatch_core::{
    config::{DocumentColumn, FleetConfig},
    DocumentType, VehicleId,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ReminderError, Result},
    types::FleetRecord,
};

/// Delimiters the sniffer chooses between, most common first.
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Which columns of the sheet mean what.
#[derive(Debug, Clone)]
pub struct FleetSchema {
    pub id_column: String,
    pub label_column: Option<String>,
    pub documents: Vec<DocumentColumn>,
    pub discover_suffix: Option<String>,
}

impl FleetSchema {
    pub fn from_config(cfg: &FleetConfig) -> Self {
        Self {
            id_column: cfg.id_column.clone(),
            label_column: Some(cfg.label_column.clone()).filter(|c| !c.trim().is_empty()),
            documents: cfg.documents.clone(),
            discover_suffix: cfg
                .discover_suffix
                .clone()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    /// Map the observed headers onto column positions.
    ///
    /// Fails with every missing mandatory column listed. Optional document
    /// columns that are absent are dropped from the run.
    pub fn resolve(&self, headers: &[String]) -> Result<ResolvedColumns> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            index.entry(normalize_header(h)).or_insert(i);
        }
        let find = |name: &str| index.get(&normalize_header(name)).copied();

        let mut missing = Vec::new();

        let id = find(&self.id_column);
        if id.is_none() {
            missing.push(self.id_column.clone());
        }

        let label = self.label_column.as_deref().and_then(find);

        let mut documents: Vec<(DocumentType, usize)> = Vec::new();
        for doc in &self.documents {
            match find(&doc.column) {
                Some(i) => documents.push((DocumentType::new(&doc.label), i)),
                None if doc.required => missing.push(doc.column.clone()),
                None => debug!(column = %doc.column, "optional document column absent, skipped"),
            }
        }

        if let Some(suffix) = &self.discover_suffix {
            let suffix = suffix.to_lowercase();
            for (i, h) in headers.iter().enumerate() {
                let name = normalize_header(h);
                let Some(prefix) = name.strip_suffix(&suffix) else {
                    continue;
                };
                let known = documents.iter().any(|(_, col)| *col == i)
                    || self
                        .documents
                        .iter()
                        .any(|d| normalize_header(&d.column) == name);
                if prefix.is_empty() || known {
                    continue;
                }
                info!(column = %h.trim(), document = %prefix, "discovered document column");
                documents.push((DocumentType::new(prefix), i));
            }
        }

        match id {
            Some(id) if missing.is_empty() => Ok(ResolvedColumns {
                id,
                label,
                documents,
            }),
            _ => Err(ReminderError::MissingColumns(missing)),
        }
    }
}

/// Column positions for one concrete sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub id: usize,
    pub label: Option<usize>,
    pub documents: Vec<(DocumentType, usize)>,
}

/// The validated fleet for this run.
#[derive(Debug, Clone, Default)]
pub struct FleetTable {
    pub records: Vec<FleetRecord>,
    /// Document types active on this run, in column order.
    pub documents: Vec<DocumentType>,
}

impl FleetTable {
    /// Parse CSV text. The delimiter is sniffed from the header line.
    ///
    /// Structural problems (unreadable CSV, missing mandatory columns) fail
    /// here, before any notification is considered.
    pub fn parse(text: &str, schema: &FleetSchema) -> Result<Self> {
        let text = text.trim_start_matches('\u{feff}');
        let delimiter = sniff_delimiter(text);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        debug!(columns = headers.len(), delimiter = %(delimiter as char), "parsed fleet headers");
        let columns = schema.resolve(&headers)?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let cell = |i: usize| record.get(i).unwrap_or("").trim();

            let vehicle = VehicleId::new(cell(columns.id));
            if vehicle.is_empty() {
                // header is line 1
                warn!(line = row + 2, "fleet row without vehicle id skipped");
                continue;
            }

            let label = columns
                .label
                .map(cell)
                .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("nan"))
                .map(str::to_string);

            let documents = columns
                .documents
                .iter()
                .map(|(doc, i)| (doc.clone(), cell(*i).to_string()))
                .collect();

            records.push(FleetRecord {
                vehicle,
                label,
                documents,
            });
        }

        info!(
            vehicles = records.len(),
            documents = columns.documents.len(),
            "fleet sheet loaded"
        );

        Ok(Self {
            records,
            documents: columns.documents.into_iter().map(|(d, _)| d).collect(),
        })
    }
}

fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase()
}

/// Pick the delimiter that occurs most often (outside quotes) on the header line.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut counts = [0usize; DELIMITERS.len()];
    let mut in_quotes = false;
    for b in header.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = DELIMITERS.iter().position(|d| *d == b) {
            counts[pos] += 1;
        }
    }
    let (best, count) = counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(i, c)| (DELIMITERS[i], *c))
        .unwrap_or((b',', 0));
    if count == 0 {
        b','
    } else {
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FleetSchema {
        FleetSchema::from_config(&FleetConfig::default())
    }

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("\"x,y\";b;c"), b';');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn headers_match_case_insensitively() {
        let text = "NR_MASINA,Marca,Rovinieta_Expira,ITP_EXPIRA,asigurare_expira\n\
                    bz10abc,Volvo,03/04/2025,2025-05-01,NA\n";
        let table = FleetTable::parse(text, &schema()).unwrap();
        assert_eq!(table.records.len(), 1);
        let r = &table.records[0];
        assert_eq!(r.vehicle.as_str(), "bz10abc");
        assert_eq!(r.label.as_deref(), Some("Volvo"));
        assert_eq!(
            r.documents,
            vec![
                (DocumentType::new("rovinieta"), "03/04/2025".to_string()),
                (DocumentType::new("itp"), "2025-05-01".to_string()),
                (DocumentType::new("asigurare"), "NA".to_string()),
            ]
        );
    }

    #[test]
    fn optional_document_column_can_be_absent() {
        let text = "nr_masina;rovinieta_expira;itp_expira\nB22XYZ;01.05.2025;\n";
        let table = FleetTable::parse(text, &schema()).unwrap();
        assert_eq!(
            table.documents,
            vec![DocumentType::new("rovinieta"), DocumentType::new("itp")]
        );
        assert_eq!(table.records[0].label, None);
    }

    #[test]
    fn missing_mandatory_columns_are_all_reported() {
        let text = "plate,itp_expira\nB22XYZ,2025-05-01\n";
        match FleetTable::parse(text, &schema()) {
            Err(ReminderError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["nr_masina".to_string(), "rovinieta_expira".to_string()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn extra_expiry_columns_are_discovered() {
        let text = "nr_masina,rovinieta_expira,tahograf_expira,note\nB22XYZ,2025-05-01,2025-06-01,x\n";
        let table = FleetTable::parse(text, &schema()).unwrap();
        assert_eq!(
            table.documents,
            vec![DocumentType::new("rovinieta"), DocumentType::new("tahograf")]
        );
    }

    #[test]
    fn discovery_can_be_disabled() {
        let mut cfg = FleetConfig::default();
        cfg.discover_suffix = None;
        let text = "nr_masina,rovinieta_expira,tahograf_expira\nB22XYZ,2025-05-01,2025-06-01\n";
        let table = FleetTable::parse(text, &FleetSchema::from_config(&cfg)).unwrap();
        assert_eq!(table.documents, vec![DocumentType::new("rovinieta")]);
    }

    #[test]
    fn blank_rows_and_rows_without_plate_are_dropped() {
        let text = "\u{feff}nr_masina,rovinieta_expira\n,\n  ,  \n,2025-05-01\nB22XYZ,2025-05-01\n";
        let table = FleetTable::parse(text, &schema()).unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].vehicle.as_str(), "B22XYZ");
    }
}

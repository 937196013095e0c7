use crate::{Catalog, GenomeResult, Scheme};
use std::io::Write;
use std::path::Path;

pub const STRAIN_COLUMN: &str = "Strain";

/// Collects per-genome results in the order they are added.
///
/// The column set is the catalog's locus list, fixed before the first genome.
#[derive(Debug)]
pub struct SummaryAggregator<'a> {
    catalog: &'a Catalog,
    rows: Vec<(String, GenomeResult)>,
}

impl<'a> SummaryAggregator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            rows: vec![],
        }
    }

    pub fn add(&mut self, genome_id: impl Into<String>, result: GenomeResult) {
        self.rows.push((genome_id.into(), result));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lays the rows out against the catalog columns and relabels the columns
    /// with the naming scheme.
    pub fn finalize(self, scheme: &Scheme) -> SummaryMatrix {
        let loci: Vec<String> = self.catalog.loci().map(|l| l.to_string()).collect();
        let labels = loci.iter().map(|l| scheme.label(l)).collect();

        let rows = self
            .rows
            .into_iter()
            .map(|(strain, result)| {
                let cells = loci
                    .iter()
                    .map(|locus| {
                        result
                            .get(locus)
                            .and_then(|call| call.allele_number())
                            .map(|n| n.to_string())
                    })
                    .collect();
                SummaryRow { strain, cells }
            })
            .collect();

        SummaryMatrix { loci, labels, rows }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub strain: String,
    /// Allele number per column, `None` when absent.
    pub cells: Vec<Option<String>>,
}

/// Strain-by-locus allele matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMatrix {
    loci: Vec<String>,
    labels: Vec<String>,
    rows: Vec<SummaryRow>,
}

impl SummaryMatrix {
    /// Raw locus ids, in column order.
    pub fn loci(&self) -> &[String] {
        &self.loci
    }

    /// Column labels after relabelling.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn cell(&self, strain: &str, locus: &str) -> Option<&str> {
        let col = self.loci.iter().position(|l| l == locus)?;
        self.rows
            .iter()
            .find(|r| r.strain == strain)
            .and_then(|r| r.cells[col].as_deref())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec![STRAIN_COLUMN];
        header.extend(self.labels.iter().map(|s| s.as_str()));
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.strain.as_str()];
            record.extend(row.cells.iter().map(|c| c.as_deref().unwrap_or("")));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;

        Ok(())
    }

    pub fn write_xlsx<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("summary")?;

        worksheet.write_string(0, 0, STRAIN_COLUMN)?;
        for (col, label) in self.labels.iter().enumerate() {
            worksheet.write_string(0, col as u16 + 1, label)?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let r = i as u32 + 1;
            worksheet.write_string(r, 0, &row.strain)?;
            for (col, cell) in row.cells.iter().enumerate() {
                if let Some(number) = cell {
                    worksheet.write_string(r, col as u16 + 1, number)?;
                }
            }
        }
        worksheet.set_freeze_panes(1, 1)?;

        workbook.save(path.as_ref())?;
        Ok(())
    }
}

//! Tabular BLAST report parser.
//!
//! The genotyper asks `blastn` for exactly these columns:
//! ```text
//! Col  Field     Description
//! 1    qseqid    Query (contig) id
//! 2    sseqid    Subject (allele) id
//! 3    pident    Percentage of identical matches
//! 4    length    Alignment length
//! 5    slen      Subject sequence length
//! 6    bitscore  Bit score
//! ```

use anyhow::{bail, Context};

/// Value passed to `blastn -outfmt`; must agree with [`AlignmentHit::parse_line`].
pub const BLAST_OUTFMT: &str = "6 qseqid sseqid pident length slen bitscore";

const NUM_FIELDS: usize = 6;

/// One row of the aligner's report: a contig against one reference allele.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub query_id: String,
    pub subject_id: String,
    pub percent_identity: f64,
    pub alignment_length: u64,
    pub subject_length: u64,
    pub bit_score: f64,
    /// Percentage of the subject covered, `alignment_length / subject_length * 100`.
    pub coverage: f64,
    /// Position among the well-formed records of the report.
    pub row: usize,
}

impl AlignmentHit {
    pub fn new(
        query_id: &str,
        subject_id: &str,
        percent_identity: f64,
        alignment_length: u64,
        subject_length: u64,
        bit_score: f64,
        row: usize,
    ) -> Self {
        let coverage = if subject_length == 0 {
            0.0
        } else {
            alignment_length as f64 / subject_length as f64 * 100.0
        };

        Self {
            query_id: query_id.to_string(),
            subject_id: subject_id.to_string(),
            percent_identity,
            alignment_length,
            subject_length,
            bit_score,
            coverage,
            row,
        }
    }

    /// Parses one tab-separated line laid out as [`BLAST_OUTFMT`].
    ///
    /// ```
    /// use cpstype::AlignmentHit;
    /// let hit = AlignmentHit::parse_line("contig_7\tCAMP1067_2\t99.12\t456\t912\t800", 0).unwrap();
    /// assert_eq!(hit.subject_id, "CAMP1067_2");
    /// assert_eq!(hit.coverage, 50.0);
    /// ```
    pub fn parse_line(line: &str, row: usize) -> anyhow::Result<Self> {
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() < NUM_FIELDS {
            bail!(
                "expected {} tab-separated fields, found {}",
                NUM_FIELDS,
                fields.len()
            );
        }
        if fields[0].is_empty() || fields[1].is_empty() {
            bail!("empty query or subject id");
        }

        let percent_identity: f64 = fields[2].parse().context("invalid percent identity")?;
        if !(0.0..=100.0).contains(&percent_identity) {
            bail!("percent identity {} out of range", percent_identity);
        }
        let alignment_length: u64 = fields[3].parse().context("invalid alignment length")?;
        let subject_length: u64 = fields[4].parse().context("invalid subject length")?;
        if subject_length == 0 {
            bail!("subject length is zero");
        }
        let bit_score: f64 = fields[5].parse().context("invalid bit score")?;

        Ok(Self::new(
            fields[0],
            fields[1],
            percent_identity,
            alignment_length,
            subject_length,
            bit_score,
            row,
        ))
    }
}

/// Parses a whole report.
///
/// Blank and `#` lines are ignored. A malformed line is skipped with a warning,
/// the rest of the report is kept. No hits yields an empty vector.
pub fn parse(raw_output: &str) -> Vec<AlignmentHit> {
    let mut hits = vec![];

    for (i, line) in raw_output.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        match AlignmentHit::parse_line(line, hits.len()) {
            Ok(hit) => hits.push(hit),
            Err(e) => log::warn!("Skipping alignment line {}: {:#}", i + 1, e),
        }
    }

    hits
}

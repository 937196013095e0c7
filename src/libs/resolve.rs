use crate::{AlignmentHit, Catalog};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

pub const DEFAULT_MINID: f64 = 95.0;
pub const DEFAULT_MINCOV: f64 = 90.0;

/// Outcome for one locus in one genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocusCall {
    Present(String),
    Absent,
}

impl LocusCall {
    pub fn allele_number(&self) -> Option<&str> {
        match self {
            LocusCall::Present(number) => Some(number),
            LocusCall::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, LocusCall::Present(_))
    }
}

/// Absent loci render as an empty cell.
impl fmt::Display for LocusCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocusCall::Present(number) => write!(f, "{}", number),
            LocusCall::Absent => Ok(()),
        }
    }
}

/// Identity and coverage cut-offs, both percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub minid: f64,
    pub mincov: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            minid: DEFAULT_MINID,
            mincov: DEFAULT_MINCOV,
        }
    }
}

impl Thresholds {
    pub fn new(minid: f64, mincov: f64) -> anyhow::Result<Self> {
        for (name, value) in [("minid", minid), ("mincov", mincov)] {
            if !(0.0..=100.0).contains(&value) {
                anyhow::bail!("--{} must be a percentage between 0 and 100, got {}", name, value);
            }
        }
        Ok(Self { minid, mincov })
    }

    /// Hard filter, no partial credit.
    pub fn accepts(&self, hit: &AlignmentHit) -> bool {
        hit.percent_identity >= self.minid && hit.coverage >= self.mincov
    }
}

/// Calls of one genome, exactly one per catalog locus in catalog order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenomeResult {
    calls: IndexMap<String, LocusCall>,
}

impl GenomeResult {
    /// A result with every catalog locus `Absent`.
    pub fn absent(catalog: &Catalog) -> Self {
        let calls = catalog
            .loci()
            .map(|locus| (locus.to_string(), LocusCall::Absent))
            .collect();
        Self { calls }
    }

    pub fn get(&self, locus: &str) -> Option<&LocusCall> {
        self.calls.get(locus)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocusCall)> + '_ {
        self.calls.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn num_present(&self) -> usize {
        self.calls.values().filter(|c| c.is_present()).count()
    }

    /// Per-genome table: `Loci`, `Allele_Num`.
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(b"Loci\tAllele_Num\n")?;
        for (locus, call) in self.iter() {
            writer.write_fmt(format_args!("{}\t{}\n", locus, call))?;
        }
        writer.flush()
    }
}

/// Ranking of two hits of the same locus. `Less` means `a` wins.
///
/// Identity descending, then coverage descending, then report order.
pub fn rank_hits(a: &AlignmentHit, b: &AlignmentHit) -> Ordering {
    b.percent_identity
        .total_cmp(&a.percent_identity)
        .then_with(|| b.coverage.total_cmp(&a.coverage))
        .then_with(|| a.row.cmp(&b.row))
}

/// Turns the hits of one genome into one call per catalog locus.
///
/// Hits below either threshold are discarded. Each locus keeps its best
/// remaining hit by [`rank_hits`]; loci without one are `Absent`. Hits on
/// alleles unknown to the catalog are ignored.
pub fn resolve(hits: &[AlignmentHit], thresholds: &Thresholds, catalog: &Catalog) -> GenomeResult {
    let mut best_of: HashMap<&str, &AlignmentHit> = HashMap::new();

    for hit in hits.iter().filter(|h| thresholds.accepts(h)) {
        let locus = match catalog.resolve_locus(&hit.subject_id) {
            Some(locus) => locus,
            None => {
                log::debug!("{} is not in the reference catalog", hit.subject_id);
                continue;
            }
        };

        best_of
            .entry(locus)
            .and_modify(|best| {
                if rank_hits(hit, *best) == Ordering::Less {
                    *best = hit;
                }
            })
            .or_insert(hit);
    }

    // iterate the catalog, not the map, so the key set and order are fixed
    let calls = catalog
        .loci()
        .map(|locus| {
            let call = best_of
                .get(locus)
                .and_then(|hit| catalog.allele(&hit.subject_id))
                .map_or(LocusCall::Absent, |allele| {
                    LocusCall::Present(allele.number.clone())
                });
            (locus.to_string(), call)
        })
        .collect();

    GenomeResult { calls }
}

use crate::writer::WriterStats;

/// Counters for one unification run.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub documents_ingested: u64,
    pub inserted: u64,
    pub merged: u64,
    /// Documents no transformer could key (MissingIdentifier).
    pub records_skipped: u64,
    pub sources_processed: u32,
    /// Source database or collection not found.
    pub sources_skipped: u32,
    /// Source cursor errored or timed out mid-scan.
    pub sources_failed: u32,
    pub writer: WriterStats,
    /// Canonical collection size after the run, when it could be counted.
    pub canonical_total: Option<u64>,
    pub cancelled: bool,
    /// Documents read per source database, in processing order.
    pub by_source: Vec<(String, u64)>,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cancelled {
            writeln!(f, "\n=== Unification Cancelled ===")?;
        } else {
            writeln!(f, "\n=== Unification Complete ===")?;
        }
        writeln!(f, "Ingested:          {}", self.documents_ingested)?;
        writeln!(f, "New:               {}", self.inserted)?;
        writeln!(f, "Updated:           {}", self.merged)?;
        writeln!(f, "Skipped:           {}", self.records_skipped)?;
        writeln!(f, "Sources processed: {}", self.sources_processed)?;
        writeln!(f, "Sources skipped:   {}", self.sources_skipped)?;
        writeln!(f, "Sources failed:    {}", self.sources_failed)?;
        writeln!(f, "Batches flushed:   {}", self.writer.batches_flushed)?;
        writeln!(f, "Ops applied:       {}", self.writer.ops_applied)?;
        writeln!(f, "Ops failed:        {}", self.writer.ops_failed)?;
        match self.canonical_total {
            Some(total) => writeln!(f, "Total now:         {total}")?,
            None => writeln!(f, "Total now:         unknown")?,
        }
        if !self.by_source.is_empty() {
            writeln!(f, "\nBy source:")?;
            for (source, count) in &self.by_source {
                writeln!(f, "  {source}: {count}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_counts_and_sources() {
        let stats = RunStats {
            documents_ingested: 3,
            inserted: 2,
            merged: 1,
            canonical_total: Some(2),
            by_source: vec![("bigspeak_scraper".to_string(), 3)],
            ..RunStats::default()
        };
        let out = stats.to_string();
        assert!(out.contains("=== Unification Complete ==="));
        assert!(out.contains("Ingested:          3"));
        assert!(out.contains("Total now:         2"));
        assert!(out.contains("  bigspeak_scraper: 3"));
    }

    #[test]
    fn cancelled_run_is_labelled() {
        let stats = RunStats {
            cancelled: true,
            ..RunStats::default()
        };
        let out = stats.to_string();
        assert!(out.contains("Cancelled"));
        assert!(out.contains("Total now:         unknown"));
    }
}

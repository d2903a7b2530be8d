/// Stats from one scan run.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub queries_issued: u32,
    pub results_found: u32,
    pub documents_extracted: u32,
    pub documents_empty: u32,
    pub documents_failed: u32,
    pub batches_synthesized: u32,
    pub batches_failed: u32,
    pub insights_stored: u32,
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Scan Complete ===")?;
        writeln!(f, "Queries issued:      {}", self.queries_issued)?;
        writeln!(f, "Results found:       {}", self.results_found)?;
        writeln!(f, "Documents extracted: {}", self.documents_extracted)?;
        writeln!(f, "Documents empty:     {}", self.documents_empty)?;
        writeln!(f, "Documents failed:    {}", self.documents_failed)?;
        writeln!(f, "Batches synthesized: {}", self.batches_synthesized)?;
        if self.batches_failed > 0 {
            writeln!(f, "Batches failed:      {}", self.batches_failed)?;
        }
        writeln!(f, "Insights stored:     {}", self.insights_stored)?;
        Ok(())
    }
}

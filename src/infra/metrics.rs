// ============================================================
// Layer 6 — Results Writer
// ============================================================
// Persists the per-iteration result records as a CSV table.
//
// The whole file is rewritten on every flush: the number of
// discriminator columns depends on the largest number of
// discriminator rounds seen so far, so appending rows one by
// one would leave earlier rows with a different shape.
//
// Output file: {results_dir}/{exp_name}_results.csv
//
// Example CSV output (2 discriminator rounds):
//   exp_name,batch,test_loss,best_test_loss,g_loss,d_loss_0,accuracy_0,d_loss_1,accuracy_1,valid,unique,novel,objective_mean,objective_std,objective_min,objective_max
//   novelty,0,2.531200,2.531200,14.021000,0.693100,0.515625,0.690200,0.531250,0.437500,0.406250,0.406250,0.928571,0.257539,0.000000,1.000000
//
// Missing values (no evaluation this iteration, discriminator
// disabled) are written as empty cells.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::record::ResultRecord;

pub struct ResultsWriter {
    csv_path: PathBuf,
}

impl ResultsWriter {
    /// Creates `dir` if needed; nothing is written until `flush`.
    pub fn new(dir: impl AsRef<Path>, exp_name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create results directory '{}'", dir.display()))?;
        Ok(Self { csv_path: dir.join(format!("{exp_name}_results.csv")) })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Overwrite the CSV with every record so far.
    pub fn flush(&self, records: &[ResultRecord]) -> Result<()> {
        let d_columns = records.iter().map(|r| r.discriminator.len()).max().unwrap_or(0);

        let file = File::create(&self.csv_path)
            .with_context(|| format!("Cannot write results to '{}'", self.csv_path.display()))?;
        let mut f = BufWriter::new(file);

        write!(f, "exp_name,batch,test_loss,best_test_loss,g_loss")?;
        for i in 0..d_columns {
            write!(f, ",d_loss_{i},accuracy_{i}")?;
        }
        writeln!(f, ",valid,unique,novel,objective_mean,objective_std,objective_min,objective_max")?;

        for r in records {
            write!(
                f,
                "{},{},{},{},{}",
                r.exp_name,
                r.batch,
                cell(r.test_loss),
                cell(r.best_test_loss),
                cell(r.g_loss),
            )?;
            for i in 0..d_columns {
                match r.discriminator.get(i) {
                    Some(step) => write!(f, ",{:.6},{:.6}", step.loss, step.accuracy)?,
                    None => write!(f, ",,")?,
                }
            }
            let s = &r.summary;
            writeln!(
                f,
                ",{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                s.valid_fraction,
                s.unique_fraction,
                s.novel_fraction,
                s.objective_mean,
                s.objective_std,
                s.objective_min,
                s.objective_max,
            )?;
        }
        f.flush()?;

        tracing::debug!("Flushed {} result rows to '{}'", records.len(), self.csv_path.display());
        Ok(())
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

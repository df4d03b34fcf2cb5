use crate::algorithms::Algorithm;
use crate::routines::optimization::adaptive::CycleSummary;
use crate::routines::optimization::Status;
use crate::routines::proximal::Penalty;
use crate::structs::trace::ObjectiveTrace;
use csv::WriterBuilder;
use eyre::{Result, WrapErr};
use ndarray::Array1;
use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Defines the result objects from a run
///
/// A [PhyloResult] holds the branch length solution of every cycle (a single one for
/// [Algorithm::ISTA] and [Algorithm::FISTA]), the concatenated objective trace and a
/// summary per cycle.
#[derive(Debug, Clone)]
pub struct PhyloResult {
    algorithm: Algorithm,
    penalty: Penalty,
    solutions: Vec<Array1<f64>>,
    trace: ObjectiveTrace,
    cycles: Vec<CycleSummary>,
    step_size: f64,
}

impl PhyloResult {
    pub fn new(
        algorithm: Algorithm,
        penalty: Penalty,
        solutions: Vec<Array1<f64>>,
        trace: ObjectiveTrace,
        cycles: Vec<CycleSummary>,
        step_size: f64,
    ) -> Self {
        Self {
            algorithm,
            penalty,
            solutions,
            trace,
            cycles,
            step_size,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    /// The final branch lengths
    pub fn branches(&self) -> Option<&Array1<f64>> {
        self.solutions.last()
    }

    pub fn solutions(&self) -> &[Array1<f64>] {
        &self.solutions
    }

    pub fn trace(&self) -> &ObjectiveTrace {
        &self.trace
    }

    pub fn cycles(&self) -> &[CycleSummary] {
        &self.cycles
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn status(&self) -> Option<Status> {
        self.cycles.last().map(|c| c.status)
    }

    /// Write the trace, cycle summaries and branch lengths to `folder`
    pub fn write_outputs(&self, folder: &str) -> Result<()> {
        self.write_trace(folder)?;
        self.write_cycles(folder)?;
        self.write_branches(folder)?;
        Ok(())
    }

    /// Writes the log-likelihood and penalized objective of every accepted iterate
    pub fn write_trace(&self, folder: &str) -> Result<()> {
        let outputfile = OutputFile::new(folder, "trace.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(outputfile.file());
        writer.write_record(["iteration", "loglik", "penalized"])?;
        for (i, (ll, pen)) in self
            .trace
            .loglik()
            .iter()
            .zip(self.trace.penalized())
            .enumerate()
        {
            writer.write_record(&[i.to_string(), ll.to_string(), pen.to_string()])?;
        }
        writer.flush()?;
        tracing::debug!("Objective trace written to {:?}", outputfile.relative_path());
        Ok(())
    }

    /// Writes one row per cycle
    pub fn write_cycles(&self, folder: &str) -> Result<()> {
        let outputfile = OutputFile::new(folder, "cycles.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(outputfile.file());
        for cycle in &self.cycles {
            writer.serialize(cycle)?;
        }
        writer.flush()?;
        tracing::debug!("Cycle summaries written to {:?}", outputfile.relative_path());
        Ok(())
    }

    /// Writes the branch lengths of each cycle, one row per cycle
    pub fn write_branches(&self, folder: &str) -> Result<()> {
        let outputfile = OutputFile::new(folder, "branches.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(outputfile.file());

        let nbranches = self.solutions.first().map_or(0, |s| s.len());
        let mut header = vec!["cycle".to_string()];
        header.extend((0..nbranches).map(|i| format!("b{}", i)));
        writer.write_record(&header)?;

        for (cycle, solution) in self.solutions.iter().enumerate() {
            let mut row = vec![(cycle + 1).to_string()];
            row.extend(solution.iter().map(|b| b.to_string()));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        tracing::debug!("Branch lengths written to {:?}", outputfile.relative_path());
        Ok(())
    }
}

/// Contains all the necessary information of an output file
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .wrap_err_with(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::fs;

    fn result() -> PhyloResult {
        let mut trace = ObjectiveTrace::new();
        trace.push(-2.0, -2.5);
        trace.push(-1.0, -1.25);
        let cycle = CycleSummary {
            cycle: 1,
            iterations: 1,
            restarts: 0,
            zeros: 1,
            gamma: 0.01,
            step_size: 0.5,
            status: Status::Converged,
        };
        PhyloResult::new(
            Algorithm::FISTA,
            Penalty::L1,
            vec![array![0.1, 0.0, 0.3]],
            trace,
            vec![cycle],
            0.5,
        )
    }

    #[test]
    fn writes_csv_outputs() {
        let folder = std::env::temp_dir().join("phylasso_output_test");
        let folder = folder.to_str().unwrap();
        result().write_outputs(folder).unwrap();

        let trace = fs::read_to_string(Path::new(folder).join("trace.csv")).unwrap();
        assert_eq!(trace.lines().count(), 3);
        assert!(trace.starts_with("iteration,loglik,penalized"));

        let branches = fs::read_to_string(Path::new(folder).join("branches.csv")).unwrap();
        assert_eq!(branches.lines().nth(1), Some("1,0.1,0,0.3"));

        let cycles = fs::read_to_string(Path::new(folder).join("cycles.csv")).unwrap();
        assert!(cycles.starts_with("cycle,iterations,restarts,zeros,gamma,step_size,status"));
        assert!(cycles.contains("Converged"));
    }

    #[test]
    fn final_branches_are_the_last_solution() {
        let result = result();
        assert_eq!(result.branches(), Some(&array![0.1, 0.0, 0.3]));
        assert_eq!(result.status(), Some(Status::Converged));
    }
}

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::{Engine, Status};
use crate::render::{Renderer, SvgRenderer, TrajectoryWriter};
use anyhow::{Context, Result};
use glob::glob;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

/// Simulation directory holding `config.toml` and one `run-NNNN` directory per run.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg = Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run a new simulation, with `seed` taking precedence over the configured one.
    pub fn create_run(&self, seed: Option<u64>) -> Result<()> {
        let run_idx = self.run_dirs().context("failed to list run dirs")?.len();

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let mut cfg = self.cfg.clone();
        if seed.is_some() {
            cfg.run.seed = seed;
        }

        let rng = Engine::make_rng(&cfg, run_idx).context("failed to make rng")?;
        let mut engine =
            Engine::generate_initial_condition(cfg, rng).context("failed to generate initial condition")?;
        log::info!("placed {} agents", engine.agents().len());

        let trajectory_file = self.trajectory_file(run_idx);
        let file = File::create(&trajectory_file)
            .with_context(|| format!("failed to create {trajectory_file:?}"))?;
        let mut renderers: Vec<Box<dyn Renderer>> = vec![Box::new(TrajectoryWriter::new(BufWriter::new(file)))];
        if self.cfg.output.svg {
            renderers.push(Box::new(SvgRenderer::new(&run_dir)));
        }

        let report = engine
            .perform_simulation(&mut renderers)
            .context("failed to perform simulation")?;

        let summary = &report.summary;
        match summary.status {
            Status::Converged => log::info!("run {run_idx} converged in {} sweeps", summary.n_sweeps),
            status => {
                let agt_vec = &report.frame.agt_vec;
                let n_neighbors = self.cfg.model.n_neighbors;
                let require_same_type = self.cfg.model.require_same_type;
                let n_unhappy = agt_vec
                    .iter()
                    .filter(|agt| !agt.is_happy(agt_vec, n_neighbors, require_same_type))
                    .count();
                log::warn!(
                    "run {run_idx} stopped without converging: {status:?}, {n_unhappy} of {} agents unhappy at cycle {}",
                    agt_vec.len(),
                    report.frame.cycle
                );
            }
        }

        let summary_file = self.summary_file(run_idx);
        let contents = toml::to_string(summary).context("failed to serialize summary")?;
        fs::write(&summary_file, contents).with_context(|| format!("failed to write {summary_file:?}"))?;

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.run_dirs().context("failed to list run dirs")?.len();
        for run_idx in 0..n_runs {
            let mut analyzer = Analyzer::new(&self.cfg);

            analyzer
                .add_file(self.trajectory_file(run_idx))
                .context("failed to add file")?;

            let results_file = self.results_file(run_idx);
            analyzer
                .save_results(&results_file)
                .context("failed to save results")?;
            log::info!("wrote {results_file:?}");
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir).with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn trajectory_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("trajectory.msgpack")
    }

    fn summary_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("summary.toml")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.toml")
    }
}

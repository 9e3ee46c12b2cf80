use crate::config::Config;
use crate::model::{self, Agent, Frame, Kind, Relocation};
use crate::render::Renderer;
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// How a simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// A full sweep moved no agent.
    Converged,
    /// The maximum number of sweeps was reached.
    SweepLimit,
    /// An agent found no happy location within the maximum number of draws.
    AttemptLimit,
}

/// Summary of a finished simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub status: Status,
    /// Number of sweeps started.
    pub n_sweeps: usize,
    /// Total number of relocations over all sweeps.
    pub n_moves: usize,
    /// Agent that exhausted its draws, if any.
    pub stalled_agent: Option<usize>,
}

/// Outcome of [`Engine::perform_simulation`] with the final population.
#[derive(Debug, Clone)]
pub struct Report {
    pub summary: Summary,
    pub frame: Frame,
}

enum Sweep {
    Completed { n_moved: usize },
    Stalled { i_agt: usize, n_moved: usize },
}

/// Simulation engine.
///
/// Holds the configuration, current population, and random number generator,
/// and runs sweeps until the population converges or a limit is reached.
pub struct Engine {
    cfg: Config,
    agt_vec: Vec<Agent>,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with `n_agents_per_type` agents of each kind at random locations.
    pub fn generate_initial_condition(cfg: Config, mut rng: ChaCha12Rng) -> Result<Self> {
        let n_agt = cfg.model.n_agents_per_type;
        let mut agt_vec = Vec::with_capacity(cfg.n_agents());
        for kind in Kind::ALL {
            agt_vec.extend((0..n_agt).map(|_| Agent::random(kind, &mut rng)));
        }
        Self::new(cfg, agt_vec, rng)
    }

    /// Create a new `Engine` from an explicit population.
    pub fn new(cfg: Config, agt_vec: Vec<Agent>, rng: ChaCha12Rng) -> Result<Self> {
        cfg.validate_neighborhood(agt_vec.len())
            .context("config does not fit the population")?;
        Ok(Self { cfg, agt_vec, rng })
    }

    /// Random number generator for a run, seeded from the config when possible.
    pub fn make_rng(cfg: &Config, run_idx: usize) -> Result<ChaCha12Rng> {
        let rng = match cfg.run.seed {
            Some(seed) => {
                let mut rng = ChaCha12Rng::seed_from_u64(seed);
                rng.set_stream(run_idx as u64);
                rng
            }
            None => ChaCha12Rng::try_from_os_rng().context("failed to seed rng from os")?,
        };
        Ok(rng)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agt_vec
    }

    /// Sweep over the population until no agent moves.
    ///
    /// The renderer receives the population before every sweep, and once more after
    /// the last one if a limit stopped the run. Hitting the sweep or draw limit is
    /// not an error; it is reported in the returned [`Summary`].
    pub fn perform_simulation<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> Result<Report> {
        let mut n_moves = 0;
        let mut cycle = 0;

        let (status, stalled_agent) = loop {
            if cycle == self.cfg.run.max_sweeps {
                log::warn!("no convergence after {cycle} sweeps");
                break (Status::SweepLimit, None);
            }

            renderer
                .render(&self.agt_vec, cycle)
                .with_context(|| format!("failed to render cycle {cycle}"))?;
            cycle += 1;

            match self.perform_sweep() {
                Sweep::Completed { n_moved } => {
                    log::info!("cycle {cycle:04}: {n_moved} agents moved");
                    n_moves += n_moved;
                    if n_moved == 0 {
                        log::info!("converged after {cycle} sweeps");
                        break (Status::Converged, None);
                    }
                }
                Sweep::Stalled { i_agt, n_moved } => {
                    n_moves += n_moved;
                    log::warn!(
                        "agent {i_agt} found no happy location in {} draws",
                        self.cfg.run.max_attempts
                    );
                    break (Status::AttemptLimit, Some(i_agt));
                }
            }
        };

        // A converged population equals the last rendered one.
        if status != Status::Converged {
            renderer
                .render(&self.agt_vec, cycle)
                .with_context(|| format!("failed to render final cycle {cycle}"))?;
        }
        renderer.finish().context("failed to finish rendering")?;

        Ok(Report {
            summary: Summary {
                status,
                n_sweeps: cycle,
                n_moves,
                stalled_agent,
            },
            frame: Frame {
                cycle,
                agt_vec: self.agt_vec.clone(),
            },
        })
    }

    fn perform_sweep(&mut self) -> Sweep {
        let n_neighbors = self.cfg.model.n_neighbors;
        let require_same_type = self.cfg.model.require_same_type;

        let mut n_moved = 0;
        for i_agt in 0..self.agt_vec.len() {
            let old_location = self.agt_vec[i_agt].location();

            // Moves are applied in place and seen by the agents after this one.
            let relocation = model::relocate(
                &mut self.agt_vec,
                i_agt,
                n_neighbors,
                require_same_type,
                self.cfg.run.max_attempts,
                &mut self.rng,
            );

            match relocation {
                Relocation::Settled { n_draws } => {
                    if self.agt_vec[i_agt].location() != old_location {
                        log::debug!("agent {i_agt} moved after {n_draws} draws");
                        n_moved += 1;
                    }
                }
                Relocation::Exhausted => return Sweep::Stalled { i_agt, n_moved },
            }
        }

        Sweep::Completed { n_moved }
    }
}

use crate::config::Config;
use crate::model::Frame;
use crate::stats::{Accumulator, Summary};
use anyhow::{Context, Result};
use rmp_serde::decode;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::Path,
};

/// Quantity measured on every frame of a trajectory.
pub trait Obs {
    fn update(&mut self, frame: &Frame) -> Result<()>;
    fn report(&self) -> ObsReport;
}

/// Per-cycle statistics of one observable.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObsReport {
    pub name: String,
    pub cycles: Vec<usize>,
    pub frames: Vec<Summary>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Results {
    n_frames: usize,
    observables: Vec<ObsReport>,
}

/// Fraction of happy agents.
pub struct HappyFraction {
    n_neighbors: usize,
    require_same_type: usize,
    cycles: Vec<usize>,
    frames: Vec<Summary>,
}

impl HappyFraction {
    pub fn new(cfg: &Config) -> Self {
        Self {
            n_neighbors: cfg.model.n_neighbors,
            require_same_type: cfg.model.require_same_type,
            cycles: Vec::new(),
            frames: Vec::new(),
        }
    }
}

impl Obs for HappyFraction {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let agt_vec = &frame.agt_vec;
        let acc: Accumulator = agt_vec
            .iter()
            .map(|agt| {
                let happy = agt.is_happy(agt_vec, self.n_neighbors, self.require_same_type);
                if happy { 1.0 } else { 0.0 }
            })
            .collect();
        self.cycles.push(frame.cycle);
        self.frames.push(acc.summary());
        Ok(())
    }

    fn report(&self) -> ObsReport {
        ObsReport {
            name: "happy_fraction".to_string(),
            cycles: self.cycles.clone(),
            frames: self.frames.clone(),
        }
    }
}

/// Share of same-kind agents among each agent's neighbors.
pub struct SameTypeShare {
    n_neighbors: usize,
    cycles: Vec<usize>,
    frames: Vec<Summary>,
}

impl SameTypeShare {
    pub fn new(cfg: &Config) -> Self {
        Self {
            n_neighbors: cfg.model.n_neighbors,
            cycles: Vec::new(),
            frames: Vec::new(),
        }
    }
}

impl Obs for SameTypeShare {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let agt_vec = &frame.agt_vec;
        let acc: Accumulator = agt_vec
            .iter()
            .filter_map(|agt| {
                let n_nbr = agt.neighbors(agt_vec, self.n_neighbors).len();
                if n_nbr == 0 {
                    return None;
                }
                let n_same = agt.count_same_type(agt_vec, self.n_neighbors);
                Some(n_same as f64 / n_nbr as f64)
            })
            .collect();
        self.cycles.push(frame.cycle);
        self.frames.push(acc.summary());
        Ok(())
    }

    fn report(&self) -> ObsReport {
        ObsReport {
            name: "same_type_share".to_string(),
            cycles: self.cycles.clone(),
            frames: self.frames.clone(),
        }
    }
}

pub struct Analyzer {
    n_frames: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: &Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(HappyFraction::new(cfg)),
            Box::new(SameTypeShare::new(cfg)),
        ];
        Self {
            n_frames: 0,
            obs_ptr_vec,
        }
    }

    pub fn add_frame(&mut self, frame: &Frame) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(frame).context("failed to update observable")?;
        }
        self.n_frames += 1;
        Ok(())
    }

    /// Read every frame of a trajectory file.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        while !reader.fill_buf().context("failed to read trajectory")?.is_empty() {
            let frame: Frame = decode::from_read(&mut reader).context("failed to read frame")?;
            self.add_frame(&frame)?;
        }
        Ok(())
    }

    pub fn reports(&self) -> Vec<ObsReport> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let results = Results {
            n_frames: self.n_frames,
            observables: self.reports(),
        };
        let contents = toml::to_string(&results).context("failed to serialize results")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}

//! Agents of the segregation model and their neighborhood logic.

use rand::{
    Rng,
    distr::{Distribution, Open01},
};
use serde::{Deserialize, Serialize};
use std::{fmt, ptr};

/// Group an agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    A,
    B,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::A, Kind::B];
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::A => write!(f, "A"),
            Kind::B => write!(f, "B"),
        }
    }
}

/// Point of the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Draw a location uniformly from the open square (0, 1) x (0, 1).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(Open01.sample(rng), Open01.sample(rng))
    }

    /// Euclidean distance between two locations.
    pub fn distance(self, other: Location) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn in_unit_square(self) -> bool {
        0.0 < self.x && self.x < 1.0 && 0.0 < self.y && self.y < 1.0
    }
}

/// Agent of the simulation.
///
/// Each agent has a fixed kind and a location that changes whenever
/// the agent is unhappy with its neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    kind: Kind,
    location: Location,
}

impl Agent {
    pub fn new(kind: Kind, location: Location) -> Self {
        Self { kind, location }
    }

    /// Create an agent of the given kind at a random location.
    pub fn random<R: Rng + ?Sized>(kind: Kind, rng: &mut R) -> Self {
        Self::new(kind, Location::random(rng))
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn distance_to(&self, other: &Agent) -> f64 {
        self.location.distance(other.location)
    }

    /// The `n_neighbors` agents of `population` closest to this one.
    ///
    /// The agent itself is skipped by identity, so a different agent sharing its
    /// location still counts. Equal distances keep population order. If there are
    /// fewer other agents than requested, all of them are returned.
    pub fn neighbors<'a>(&self, population: &'a [Agent], n_neighbors: usize) -> Vec<&'a Agent> {
        let mut dist_vec: Vec<(f64, &Agent)> = population
            .iter()
            .filter(|other| !ptr::eq(*other, self))
            .map(|other| (self.distance_to(other), other))
            .collect();

        // Stable sort, ties stay in population order.
        dist_vec.sort_by(|a, b| a.0.total_cmp(&b.0));

        dist_vec
            .into_iter()
            .take(n_neighbors)
            .map(|(_, other)| other)
            .collect()
    }

    /// Number of same-kind agents among the neighbors.
    pub fn count_same_type(&self, population: &[Agent], n_neighbors: usize) -> usize {
        self.neighbors(population, n_neighbors)
            .into_iter()
            .filter(|other| other.kind == self.kind)
            .count()
    }

    pub fn is_happy(&self, population: &[Agent], n_neighbors: usize, require_same_type: usize) -> bool {
        self.count_same_type(population, n_neighbors) >= require_same_type
    }
}

/// Result of a bounded relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// The agent is happy after `n_draws` new locations (zero if it already was).
    Settled { n_draws: usize },
    /// No happy location was found within the allowed draws.
    Exhausted,
}

/// Move agent `i_agt` to random locations until it is happy.
///
/// Happiness is evaluated against the current state of `agt_vec`, including
/// agents already moved earlier in the same sweep. At most `max_draws` new
/// locations are tried; if none works, the agent is put back where it started.
pub fn relocate<R: Rng + ?Sized>(
    agt_vec: &mut [Agent],
    i_agt: usize,
    n_neighbors: usize,
    require_same_type: usize,
    max_draws: usize,
    rng: &mut R,
) -> Relocation {
    let old_location = agt_vec[i_agt].location;

    let mut n_draws = 0;
    while !agt_vec[i_agt].is_happy(agt_vec, n_neighbors, require_same_type) {
        if n_draws == max_draws {
            agt_vec[i_agt].location = old_location;
            return Relocation::Exhausted;
        }
        agt_vec[i_agt].location = Location::random(rng);
        debug_assert!(agt_vec[i_agt].location.in_unit_square());
        n_draws += 1;
    }

    Relocation::Settled { n_draws }
}

/// Snapshot of the population at the start of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub cycle: usize,
    pub agt_vec: Vec<Agent>,
}

/// Borrowed form of [`Frame`] with the same encoding.
#[derive(Serialize)]
pub struct FrameRef<'a> {
    pub cycle: usize,
    pub agt_vec: &'a [Agent],
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn agent(kind: Kind, x: f64, y: f64) -> Agent {
        Agent::new(kind, Location::new(x, y))
    }

    fn corners() -> Vec<Agent> {
        vec![
            agent(Kind::A, 0.1, 0.1),
            agent(Kind::A, 0.9, 0.9),
            agent(Kind::B, 0.1, 0.9),
            agent(Kind::B, 0.9, 0.1),
        ]
    }

    #[test]
    fn distance_is_euclidean_and_symmetric() {
        let a = agent(Kind::A, 0.1, 0.2);
        let b = agent(Kind::B, 0.4, 0.6);
        assert!((a.distance_to(&b) - 0.5).abs() < 1e-12);
        assert_eq!(a.distance_to(&b), b.distance_to(&a));

        let mut rng = ChaCha12Rng::seed_from_u64(3);
        for _ in 0..100 {
            let a = Agent::random(Kind::A, &mut rng);
            let b = Agent::random(Kind::B, &mut rng);
            assert_eq!(a.distance_to(&b), b.distance_to(&a));
        }
    }

    #[test]
    fn random_locations_stay_inside_open_square() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        for _ in 0..10_000 {
            assert!(Location::random(&mut rng).in_unit_square());
        }
    }

    #[test]
    fn corner_neighbors_match_geometry() {
        let agt_vec = corners();

        // Both opposite-kind corners are at distance 0.8, the same-kind corner at
        // 0.8 * sqrt(2); ties resolve to the earlier agent.
        let expected = [2, 2, 0, 0];
        for (agt, &i_nbr) in agt_vec.iter().zip(expected.iter()) {
            let nbr_vec = agt.neighbors(&agt_vec, 1);
            assert_eq!(nbr_vec.len(), 1);
            assert!(ptr::eq(nbr_vec[0], &agt_vec[i_nbr]));
            assert!(!agt.is_happy(&agt_vec, 1, 1));
        }

        let nbr_vec = agt_vec[0].neighbors(&agt_vec, 3);
        assert!(ptr::eq(nbr_vec[0], &agt_vec[2]));
        assert!(ptr::eq(nbr_vec[1], &agt_vec[3]));
        assert!(ptr::eq(nbr_vec[2], &agt_vec[1]));
        assert!(agt_vec[0].is_happy(&agt_vec, 3, 1));
        assert!(!agt_vec[0].is_happy(&agt_vec, 3, 2));
    }

    #[test]
    fn agent_is_never_its_own_neighbor() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let agt_vec: Vec<_> = (0..50)
            .map(|i| Agent::random(Kind::ALL[i % 2], &mut rng))
            .collect();
        for agt in &agt_vec {
            let nbr_vec = agt.neighbors(&agt_vec, 49);
            assert_eq!(nbr_vec.len(), 49);
            assert!(nbr_vec.iter().all(|nbr| !ptr::eq(*nbr, agt)));
        }
    }

    #[test]
    fn coincident_agent_is_still_a_neighbor() {
        let agt_vec = vec![
            agent(Kind::A, 0.5, 0.5),
            agent(Kind::A, 0.5, 0.5),
            agent(Kind::B, 0.6, 0.5),
        ];
        let nbr_vec = agt_vec[0].neighbors(&agt_vec, 1);
        assert!(ptr::eq(nbr_vec[0], &agt_vec[1]));
        assert!(agt_vec[0].is_happy(&agt_vec, 1, 1));
    }

    #[test]
    fn neighbor_set_truncates_to_population() {
        let agt_vec = corners();
        assert_eq!(agt_vec[0].neighbors(&agt_vec, 10).len(), 3);
        assert_eq!(agt_vec[0].count_same_type(&agt_vec, 10), 1);
    }

    #[test]
    fn zero_neighbors_is_trivially_happy() {
        let agt_vec = corners();
        assert!(agt_vec[0].neighbors(&agt_vec, 0).is_empty());
        assert!(agt_vec.iter().all(|agt| agt.is_happy(&agt_vec, 0, 0)));
    }

    #[test]
    fn happiness_is_deterministic() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let agt_vec: Vec<_> = (0..40)
            .map(|i| Agent::random(Kind::ALL[i % 2], &mut rng))
            .collect();
        for agt in &agt_vec {
            let first = agt.is_happy(&agt_vec, 6, 3);
            for _ in 0..3 {
                assert_eq!(agt.is_happy(&agt_vec, 6, 3), first);
            }
        }
    }

    #[test]
    fn relocated_agent_is_happy() {
        let mut rng = ChaCha12Rng::seed_from_u64(21);
        let mut agt_vec: Vec<_> = (0..60)
            .map(|i| Agent::random(Kind::ALL[i % 2], &mut rng))
            .collect();
        for i_agt in 0..agt_vec.len() {
            let kind = agt_vec[i_agt].kind();
            let result = relocate(&mut agt_vec, i_agt, 4, 2, 100_000, &mut rng);
            assert!(matches!(result, Relocation::Settled { .. }));
            assert_eq!(agt_vec[i_agt].kind(), kind);
            assert!(agt_vec[i_agt].location().in_unit_square());
            assert!(agt_vec[i_agt].is_happy(&agt_vec, 4, 2));
        }
    }

    #[test]
    fn happy_agent_does_not_move() {
        let mut agt_vec = corners();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let before = agt_vec.clone();
        let result = relocate(&mut agt_vec, 0, 3, 1, 10, &mut rng);
        assert_eq!(result, Relocation::Settled { n_draws: 0 });
        assert_eq!(agt_vec, before);
    }

    #[test]
    fn exhausted_relocation_restores_location() {
        // A lone A among B agents can never have an A neighbor.
        let mut agt_vec = vec![
            agent(Kind::A, 0.5, 0.5),
            agent(Kind::B, 0.2, 0.2),
            agent(Kind::B, 0.8, 0.8),
        ];
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let result = relocate(&mut agt_vec, 0, 2, 1, 25, &mut rng);
        assert_eq!(result, Relocation::Exhausted);
        assert_eq!(agt_vec[0].location(), Location::new(0.5, 0.5));
    }
}

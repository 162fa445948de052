//! Seeded synthetic deployment environment.
//!
//! Applications run either locally (action 0, drains battery, free) or
//! offloaded to their host infrastructure node (action 1, costs in
//! proportion to the host's load and raises that load). Application
//! features are `[cost, battery]`, infrastructure features are
//! `[load, capacity, latency]`, every edge carries a one-value latency.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::{EdgeRelation, EdgeSet, GraphSchema, HeteroGraph, NodeKind};
use crate::rl::environment::GraphEnvironment;

pub const NUM_ACTIONS: usize = 2;
pub const RUN_LOCALLY: usize = 0;
pub const OFFLOAD: usize = 1;

pub struct SyntheticDeployment {
    apps: usize,
    infra: usize,
    seed: u64,
    rng: StdRng,
    cost: Vec<f32>,
    battery: Vec<f32>,
    load: Vec<f32>,
    capacity: Vec<f32>,
    latency: Vec<f32>,
}

impl SyntheticDeployment {
    pub fn new(apps: usize, infra: usize, seed: u64) -> Self {
        let infra = infra.max(1);
        let mut env = Self {
            apps,
            infra,
            seed,
            rng: StdRng::seed_from_u64(seed),
            cost: vec![0.0; apps],
            battery: vec![1.0; apps],
            load: vec![0.0; infra],
            capacity: vec![1.0; infra],
            latency: vec![0.0; infra],
        };
        env.randomize();
        env
    }

    pub fn schema() -> GraphSchema {
        GraphSchema::new()
            .node(NodeKind::Application, 2)
            .node(NodeKind::Infrastructure, 3)
            .relation(EdgeRelation::AppToInfrastructure, Some(1))
            .relation(EdgeRelation::AppToApp, Some(1))
            .relation(EdgeRelation::InfrastructureToInfrastructure, Some(1))
    }

    fn host(&self, app: usize) -> usize {
        app % self.infra
    }

    fn randomize(&mut self) {
        for b in self.battery.iter_mut() {
            *b = self.rng.gen_range(0.5..=1.0);
        }
        self.cost.iter_mut().for_each(|c| *c = 0.0);
        let hosts = self.load.iter_mut().zip(&mut self.capacity).zip(&mut self.latency);
        for ((load, capacity), latency) in hosts {
            *load = self.rng.gen_range(0.0..0.5);
            *capacity = self.rng.gen_range(0.5..=1.0);
            *latency = self.rng.gen_range(0.01..0.2);
        }
    }

    fn observe(&self) -> HeteroGraph {
        let apps = (0..self.apps).map(|i| vec![self.cost[i], self.battery[i]]).collect();
        let infra = (0..self.infra)
            .map(|j| vec![self.load[j], self.capacity[j], self.latency[j]])
            .collect();

        let hosting: Vec<(usize, usize)> = (0..self.apps).map(|i| (i, self.host(i))).collect();
        let hosting_attrs = hosting.iter().map(|(_, h)| vec![self.latency[*h]]).collect();

        let chain = |n: usize| -> Vec<(usize, usize)> {
            if n < 2 {
                Vec::new()
            } else {
                (0..n - 1).map(|i| (i, i + 1)).collect()
            }
        };
        let app_links = chain(self.apps);
        let app_attrs = vec![vec![1.0]; app_links.len()];
        let infra_links = chain(self.infra);
        let infra_attrs = infra_links
            .iter()
            .map(|(a, b)| vec![self.latency[*a] + self.latency[*b]])
            .collect();

        HeteroGraph::new()
            .with_nodes(NodeKind::Application, apps)
            .with_nodes(NodeKind::Infrastructure, infra)
            .with_edges(EdgeRelation::AppToInfrastructure, EdgeSet::with_attrs(hosting, hosting_attrs))
            .with_edges(EdgeRelation::AppToApp, EdgeSet::with_attrs(app_links, app_attrs))
            .with_edges(
                EdgeRelation::InfrastructureToInfrastructure,
                EdgeSet::with_attrs(infra_links, infra_attrs),
            )
    }
}

impl GraphEnvironment for SyntheticDeployment {
    fn reset(&mut self) -> HeteroGraph {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.randomize();
        self.observe()
    }

    fn step(&mut self, actions: &[usize]) -> (HeteroGraph, bool) {
        for load in self.load.iter_mut() {
            *load *= 0.8;
        }
        for (i, &action) in actions.iter().enumerate().take(self.apps) {
            let host = self.host(i);
            if action == OFFLOAD {
                self.battery[i] -= 0.01;
                self.cost[i] = 0.1 + 0.4 * self.load[host] / self.capacity[host];
                self.load[host] = (self.load[host] + 0.1).min(1.0);
            } else {
                self.battery[i] -= 0.08;
                self.cost[i] = 0.0;
            }
            if self.battery[i] <= 0.0 {
                // swapped for a charged one
                self.battery[i] = 1.0;
            }
        }
        for load in self.load.iter_mut() {
            *load = (*load + self.rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0);
        }
        (self.observe(), false)
    }
}

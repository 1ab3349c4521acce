use ringleader_common::{NodeId, PayloadTag, Recipient};
use ringnode::bus::MemoryBus;
use ringnode::diagnostics::Diagnostics;
use ringnode::node::{
    CoordinationNode, CriticalSection, Effect, NodeRuntime, NodeTimings, TokenPass,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Drives a group of state machines by hand: publishes reach every node,
/// election timers fire once the bus is quiet.
struct Simulation {
    nodes: Vec<CoordinationNode>,
    pending: VecDeque<Effect>,
    timers: Vec<(usize, u64)>,
}

impl Simulation {
    fn new(ids: &[u32]) -> Self {
        Self {
            nodes: ids
                .iter()
                .map(|id| CoordinationNode::with_seed(NodeId::new(*id), NodeTimings::default(), 7))
                .collect(),
            pending: VecDeque::new(),
            timers: Vec::new(),
        }
    }

    fn push(&mut self, from: usize, effects: Vec<Effect>) {
        for effect in effects {
            if let Effect::ArmElectionTimer { attempt, .. } = effect {
                self.timers.push((from, attempt));
            } else {
                self.pending.push_back(effect);
            }
        }
    }

    fn settle(&mut self) {
        loop {
            while let Some(effect) = self.pending.pop_front() {
                let Some(envelope) = effect.as_publish().cloned() else {
                    continue;
                };
                for i in 0..self.nodes.len() {
                    let effects = self.nodes[i].receive(&envelope);
                    self.push(i, effects);
                }
            }

            if self.timers.is_empty() {
                break;
            }
            for (i, attempt) in std::mem::take(&mut self.timers) {
                let effects = self.nodes[i].on_election_timeout(attempt);
                self.push(i, effects);
            }
        }
    }
}

#[test]
fn test_state_machines_converge_without_runtime() {
    let mut sim = Simulation::new(&[0, 1, 2]);

    let effects = sim.nodes[0].start_election();
    sim.push(0, effects);
    sim.settle();

    for node in &sim.nodes {
        assert_eq!(node.leader(), Some(NodeId::new(2)), "node {}", node.id());
        assert!(!node.is_electing());
    }
    let online: Vec<u32> = sim.nodes[0].online().iter().map(NodeId::value).collect();
    assert_eq!(online, vec![1, 2]);

    assert!(sim.nodes[1].seed_token());
    let envelope = match sim.nodes[1].pass_token().unwrap() {
        TokenPass::Passed { to, envelope } => {
            assert_eq!(to, NodeId::new(2));
            envelope
        }
        TokenPass::NotHolding => panic!("seeded node did not pass the token"),
    };
    assert_eq!(envelope.tag(), PayloadTag::Token);
    assert_eq!(envelope.recipient(), Recipient::Node(NodeId::new(2)));

    let effects = sim.nodes[2].receive(&envelope);
    assert!(effects.iter().any(|e| matches!(e, Effect::UseResource { .. })));
    let holders: Vec<bool> = sim.nodes.iter().map(CoordinationNode::holds_token).collect();
    assert_eq!(holders, vec![false, false, true]);
}

/// Records the order in which nodes enter the critical section
#[derive(Default)]
struct Visits(Mutex<Vec<u32>>);

impl CriticalSection for Visits {
    async fn run(&self, holder: NodeId, hold_for: Duration) {
        if let Ok(mut visits) = self.0.lock() {
            visits.push(holder.value());
        }
        tokio::time::sleep(hold_for).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_memory_bus_group_circulates_token_in_id_order() {
    let bus = Arc::new(MemoryBus::default());
    let visits = Arc::new(Visits::default());
    let diagnostics = Diagnostics::new();
    let (shutdown, _) = broadcast::channel(1);

    let mut handles = Vec::new();
    for id in [3_u32, 5, 8] {
        let node = CoordinationNode::with_seed(NodeId::new(id), NodeTimings::default(), u64::from(id));
        let (handle, _task) = NodeRuntime::start(
            node,
            bus.clone(),
            visits.clone(),
            diagnostics.clone(),
            shutdown.subscribe(),
        )
        .await
        .unwrap();
        handles.push(handle);
    }

    handles[0].start_election().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    handles[0].seed_token().await.unwrap();
    tokio::time::sleep(Duration::from_secs(40)).await;

    let visits = visits.0.lock().unwrap().clone();
    assert!(visits.len() >= 6, "only {} visits", visits.len());
    let expected: Vec<u32> = [5, 8, 3].iter().copied().cycle().take(visits.len()).collect();
    assert_eq!(visits, expected);

    let status = handles[2].status().await.unwrap();
    assert_eq!(status.leader, Some(NodeId::new(8)));
    assert!(!diagnostics.entries(NodeId::new(8)).await.is_empty());

    shutdown.send(()).unwrap();
}

//! Single-writer event loop around a `CoordinationNode`.
//!
//! Bus deliveries, timer expiries and harness commands are all funnelled
//! into one task and applied one at a time, so no two transitions ever
//! interleave. Timers and critical-section bodies run in their own tasks
//! and report back through the internal event channel.

use ringleader_common::constants::COMMAND_QUEUE_CAPACITY;
use ringleader_common::{Envelope, NodeId, RingleaderError};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::coordinator::{CoordinationNode, NodeStatus, TokenPass};
use super::effect::Effect;
use super::section::CriticalSection;
use crate::bus::{MessageBus, Subscription};
use crate::diagnostics::Diagnostics;

/// Requests from the bootstrap harness and the status surface
#[derive(Debug)]
enum Command {
    StartElection,
    SeedToken,
    Status(oneshot::Sender<NodeStatus>),
}

/// Internal timer and task completions
#[derive(Debug)]
enum Event {
    ElectionTimeout { attempt: u64 },
    ResourceReleased,
}

/// Cloneable handle to a running node
#[derive(Clone)]
pub struct NodeHandle {
    node_id: NodeId,
    commands: mpsc::Sender<Command>,
}

impl NodeHandle {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Start an election attempt (no-op if one is outstanding)
    pub async fn start_election(&self) -> Result<(), RingleaderError> {
        self.send(Command::StartElection).await
    }

    /// Create the group's first token here and pass it on immediately.
    /// Ignored while this node already holds a token.
    pub async fn seed_token(&self) -> Result<(), RingleaderError> {
        self.send(Command::SeedToken).await
    }

    pub async fn status(&self) -> Result<NodeStatus, RingleaderError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx)).await?;
        rx.await.map_err(|_| RingleaderError::RuntimeStopped)
    }

    async fn send(&self, command: Command) -> Result<(), RingleaderError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RingleaderError::RuntimeStopped)
    }
}

/// Event loop state
pub struct NodeRuntime<B, S> {
    node: CoordinationNode,
    bus: Arc<B>,
    section: Arc<S>,
    diagnostics: Diagnostics,
    inbound: Subscription,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
}

impl<B, S> NodeRuntime<B, S>
where
    B: MessageBus,
    S: CriticalSection,
{
    /// Subscribe to the bus and spawn the event loop
    pub async fn start(
        node: CoordinationNode,
        bus: Arc<B>,
        section: Arc<S>,
        diagnostics: Diagnostics,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(NodeHandle, JoinHandle<()>), RingleaderError> {
        let inbound = bus.subscribe().await?;
        let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (events_tx, events) = mpsc::unbounded_channel();
        let node_id = node.id();

        diagnostics.record(node_id, node.clock(), "Connected").await;
        tracing::info!(node = %node_id, "Node connected to bus");

        let runtime = Self {
            node,
            bus,
            section,
            diagnostics,
            inbound,
            commands,
            events_tx,
            events,
        };
        let task = tokio::spawn(runtime.run(shutdown));

        Ok((
            NodeHandle {
                node_id,
                commands: commands_tx,
            },
            task,
        ))
    }

    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                inbound = self.inbound.recv() => match inbound {
                    Some(payload) => self.handle_payload(&payload).await,
                    None => {
                        tracing::warn!(node = %self.node.id(), "Bus subscription closed");
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_event(event).await,
                Some(command) = self.commands.recv() => self.handle_command(command).await,
                _ = shutdown.recv() => {
                    tracing::info!(node = %self.node.id(), "Node runtime shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_payload(&mut self, payload: &[u8]) {
        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(node = %self.node.id(), error = %e, "Dropping malformed envelope");
                return;
            }
        };

        let effects = self.node.receive(&envelope);
        self.execute(effects).await;
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::ElectionTimeout { attempt } => {
                let effects = self.node.on_election_timeout(attempt);
                self.execute(effects).await;
            }
            Event::ResourceReleased => {
                let pass = self.node.release_resource();
                self.complete_pass(pass).await;
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartElection => {
                let effects = self.node.start_election();
                self.execute(effects).await;
            }
            Command::SeedToken => {
                // A held token is passed by its critical section, never here
                if self.node.seed_token() {
                    let pass = self.node.pass_token();
                    self.complete_pass(pass).await;
                }
            }
            Command::Status(reply) => {
                let _ = reply.send(self.node.status());
            }
        }
    }

    /// Publish a successful pass; drop the token when nobody can take it
    async fn complete_pass(&mut self, pass: Result<TokenPass, RingleaderError>) {
        match pass {
            Ok(TokenPass::Passed { envelope, .. }) => {
                self.execute(vec![Effect::Publish(envelope)]).await;
            }
            Ok(TokenPass::NotHolding) => {}
            Err(e) => {
                tracing::error!(node = %self.node.id(), error = %e, "Cannot pass token, dropping it");
                self.node.drop_token();
                self.diagnostics
                    .record(self.node.id(), self.node.clock(), "Dropped token: no peers online")
                    .await;
            }
        }
    }

    async fn execute(&mut self, effects: Vec<Effect>) {
        let node_id = self.node.id();

        for effect in effects {
            match effect {
                Effect::Received { from, tag, clock } => {
                    self.diagnostics
                        .record(node_id, clock, format!("Received from {from}: {tag}"))
                        .await;
                }
                Effect::Publish(envelope) => {
                    self.diagnostics
                        .record(node_id, envelope.clock(), format!("Sent: {}", envelope.tag()))
                        .await;
                    self.publish(&envelope).await;
                }
                Effect::ArmElectionTimer { attempt, after } => {
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = events.send(Event::ElectionTimeout { attempt });
                    });
                }
                Effect::UseResource { hold_for } => {
                    let events = self.events_tx.clone();
                    let section = self.section.clone();
                    tokio::spawn(async move {
                        section.run(node_id, hold_for).await;
                        let _ = events.send(Event::ResourceReleased);
                    });
                }
            }
        }
    }

    async fn publish(&self, envelope: &Envelope) {
        let payload = match envelope.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize envelope");
                return;
            }
        };

        // Best effort: lost messages are a liveness risk, not a safety one
        if let Err(e) = self.bus.publish(payload).await {
            tracing::warn!(
                node = %envelope.sender(),
                tag = %envelope.tag(),
                error = %e,
                retryable = e.is_retryable(),
                "Failed to publish envelope"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::node::coordinator::NodeTimings;
    use ringleader_common::{PayloadTag, Recipient};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Critical section that measures how many nodes are inside at once
    #[derive(Default)]
    struct SharedResource {
        inside: AtomicUsize,
        max_inside: AtomicUsize,
        entries: AtomicUsize,
    }

    impl CriticalSection for SharedResource {
        async fn run(&self, _holder: NodeId, hold_for: Duration) {
            let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_inside.fetch_max(now, Ordering::SeqCst);
            self.entries.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(hold_for).await;
            self.inside.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct Group {
        bus: Arc<MemoryBus>,
        handles: Vec<NodeHandle>,
        diagnostics: Diagnostics,
        resource: Arc<SharedResource>,
        _shutdown: broadcast::Sender<()>,
    }

    async fn spawn_group(ids: &[u32]) -> Group {
        let bus = Arc::new(MemoryBus::default());
        let resource = Arc::new(SharedResource::default());
        let diagnostics = Diagnostics::new();
        let (shutdown, _) = broadcast::channel(1);
        let mut handles = Vec::new();

        for id in ids {
            let node = CoordinationNode::with_seed(NodeId::new(*id), NodeTimings::default(), u64::from(*id));
            let (handle, _task) = NodeRuntime::start(
                node,
                bus.clone(),
                resource.clone(),
                diagnostics.clone(),
                shutdown.subscribe(),
            )
            .await
            .unwrap();
            handles.push(handle);
        }

        Group {
            bus,
            handles,
            diagnostics,
            resource,
            _shutdown: shutdown,
        }
    }

    async fn statuses(group: &Group) -> Vec<NodeStatus> {
        let mut out = Vec::new();
        for handle in &group.handles {
            out.push(handle.status().await.unwrap());
        }
        out
    }

    fn ids(values: &[u32]) -> Vec<NodeId> {
        values.iter().copied().map(NodeId::new).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_elects_highest_and_learns_membership() {
        let group = spawn_group(&[0, 1, 2]).await;

        group.handles[0].start_election().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let all = statuses(&group).await;
        for status in &all {
            assert_eq!(status.leader, Some(NodeId::new(2)), "node {}", status.node_id);
            assert!(!status.electing);
        }
        assert_eq!(all[0].online, ids(&[1, 2]));
        assert_eq!(all[1].online, ids(&[0, 2]));
        assert_eq!(all[2].online, ids(&[0, 1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_circulates_with_mutual_exclusion() {
        let group = spawn_group(&[0, 1, 2]).await;

        group.handles[0].start_election().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        group.handles[1].seed_token().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(group.resource.max_inside.load(Ordering::SeqCst), 1);
        // 2-5 s per stay: at least a full lap in a minute
        assert!(group.resource.entries.load(Ordering::SeqCst) >= 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_on_holder_keeps_single_occupant() {
        let group = spawn_group(&[0, 1, 2]).await;

        group.handles[0].start_election().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        // Node 1 passes straight to node 2, which enters the section
        group.handles[1].seed_token().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(group.handles[2].status().await.unwrap().holds_token);
        assert_eq!(group.resource.inside.load(Ordering::SeqCst), 1);

        group.handles[2].seed_token().await.unwrap();
        assert!(group.handles[2].status().await.unwrap().holds_token);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(group.resource.max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_without_membership_drops_token() {
        let group = spawn_group(&[4]).await;

        group.handles[0].seed_token().await.unwrap();
        let status = group.handles[0].status().await.unwrap();

        assert!(!status.holds_token);
        let log = group.diagnostics.entries(NodeId::new(4)).await;
        assert!(log.iter().any(|e| e.description.contains("Dropped token")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_and_foreign_payloads_change_nothing() {
        let group = spawn_group(&[1]).await;
        let before = group.handles[0].status().await.unwrap();

        group.bus.inject("definitely not json");
        group.bus.inject(r#"{"sender":3,"to":-1,"data":"Bribe","clock":99}"#);
        let misaddressed = Envelope::new(NodeId::new(3), Recipient::Node(NodeId::new(2)), PayloadTag::Token, 99);
        group.bus.inject(misaddressed.encode().unwrap());
        let echo = Envelope::new(NodeId::new(1), Recipient::Broadcast, PayloadTag::ImLeader, 99);
        group.bus.inject(echo.encode().unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(group.handles[0].status().await.unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics_record_sends_and_receives() {
        let group = spawn_group(&[0, 1]).await;

        group.handles[1].start_election().await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        let rendered = group.diagnostics.render(NodeId::new(0)).await;
        assert_eq!(rendered[0], "0.\tConnected");
        assert!(rendered.iter().any(|line| line.ends_with("Received from 1: ImLeader")));
        assert!(rendered.iter().any(|line| line.ends_with("Sent: ImOnline")));
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_runtime() {
        let bus = Arc::new(MemoryBus::default());
        let (shutdown, _) = broadcast::channel(1);
        let node = CoordinationNode::new(NodeId::new(0), NodeTimings::default());
        let (handle, task) = NodeRuntime::start(
            node,
            bus,
            Arc::new(crate::node::SimulatedWork),
            Diagnostics::new(),
            shutdown.subscribe(),
        )
        .await
        .unwrap();

        shutdown.send(()).unwrap();
        task.await.unwrap();

        assert!(matches!(handle.status().await, Err(RingleaderError::RuntimeStopped)));
    }
}

//! Shared audio context and node handles

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use super::node::{Node, NodeId, NodeKind, Oscillator};
use super::AudioParam;

/// The graph behind a context
#[derive(Debug)]
struct Graph {
    sample_rate: u32,
    frames: u64,
    next_id: u64,
    destination: NodeId,
    nodes: HashMap<NodeId, Node>,
}

impl Graph {
    fn new(sample_rate: u32) -> Self {
        let destination = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(destination, Node::new(NodeKind::Destination));

        Self {
            sample_rate,
            frames: 0,
            next_id: 1,
            destination,
            nodes,
        }
    }

    fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(kind));
        id
    }

    /// Whether `to` is reachable from `from` by following outputs
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.outputs.iter().copied());
            }
        }
        false
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> bool {
        let accepts_input = match self.nodes.get(&to) {
            Some(node) => !matches!(node.kind, NodeKind::Oscillator(_)),
            None => false,
        };
        if !accepts_input || !self.nodes.contains_key(&from) || self.reaches(to, from) {
            return false;
        }

        if let Some(node) = self.nodes.get_mut(&from) {
            if node.outputs.contains(&to) {
                return true;
            }
            node.outputs.push(to);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.inputs.push(from);
        }
        true
    }

    fn disconnect(&mut self, id: NodeId) {
        let outputs = match self.nodes.get_mut(&id) {
            Some(node) => std::mem::take(&mut node.outputs),
            None => return,
        };
        for out in outputs {
            if let Some(node) = self.nodes.get_mut(&out) {
                node.inputs.retain(|&input| input != id);
            }
        }

        let orphaned = self
            .nodes
            .get(&id)
            .map(|node| node.inputs.is_empty())
            .unwrap_or(false);
        if orphaned && id != self.destination {
            self.nodes.remove(&id);
        }
    }

    fn param_mut(&mut self, id: NodeId, name: ParamName) -> Option<&mut AudioParam> {
        match (&mut self.nodes.get_mut(&id)?.kind, name) {
            (NodeKind::Gain { gain }, ParamName::Gain) => Some(gain),
            (NodeKind::Oscillator(osc), ParamName::Frequency) => Some(&mut osc.frequency),
            _ => None,
        }
    }

    fn oscillator_mut(&mut self, id: NodeId) -> Option<&mut Oscillator> {
        match &mut self.nodes.get_mut(&id)?.kind {
            NodeKind::Oscillator(osc) => Some(osc),
            _ => None,
        }
    }

    /// Output of `id` for the given frame, evaluated once per frame
    fn pull(&mut self, id: NodeId, frame: u64, t: f64) -> f64 {
        let inputs = match self.nodes.get_mut(&id) {
            Some(node) if node.frame == frame => return node.cached,
            Some(node) => std::mem::take(&mut node.inputs),
            None => return 0.0,
        };

        let mut sum = 0.0;
        for &input in &inputs {
            sum += self.pull(input, frame, t);
        }

        let sample_rate = self.sample_rate as f64;
        let Some(node) = self.nodes.get_mut(&id) else {
            return 0.0;
        };
        node.inputs = inputs;

        let output = match &mut node.kind {
            NodeKind::Destination => sum,
            NodeKind::Gain { gain } => sum * gain.value_at(t) as f64,
            NodeKind::Oscillator(osc) => osc.generate(t, sample_rate),
        };
        node.frame = frame;
        node.cached = output;
        output
    }

    fn render(&mut self, out: &mut [f32]) {
        let sample_rate = self.sample_rate as f64;
        for sample in out.iter_mut() {
            let t = self.frames as f64 / sample_rate;
            *sample = self.pull(self.destination, self.frames, t) as f32;
            self.frames += 1;
        }

        let now = self.current_time();
        for node in self.nodes.values_mut() {
            match &mut node.kind {
                NodeKind::Gain { gain } => gain.prune_before(now),
                NodeKind::Oscillator(osc) => osc.frequency.prune_before(now),
                NodeKind::Destination => {}
            }
        }
    }
}

/// Which parameter of a node a [`ParamRef`] addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamName {
    Gain,
    Frequency,
}

/// Shared handle to an audio graph.
///
/// Cloning is cheap; every clone addresses the same graph. The clock only
/// moves when the graph is rendered, either by a realtime
/// [`Player`](crate::engine::Player) or offline.
#[derive(Debug, Clone)]
pub struct AudioContext {
    inner: Arc<Mutex<Graph>>,
}

impl AudioContext {
    /// Create a context rendering at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Graph::new(sample_rate.max(1)))),
        }
    }

    // A panic elsewhere must not silence the graph, so poisoning is ignored.
    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.graph().sample_rate
    }

    /// Seconds of audio rendered so far
    pub fn current_time(&self) -> f64 {
        self.graph().current_time()
    }

    /// The node everything audible ends up in
    pub fn destination(&self) -> DestinationNode {
        let id = self.graph().destination;
        DestinationNode {
            context: self.clone(),
            id,
        }
    }

    /// Create a gain node with unity gain
    pub fn create_gain(&self) -> GainNode {
        let id = self.graph().add(NodeKind::Gain {
            gain: AudioParam::new(1.0),
        });
        GainNode {
            context: self.clone(),
            id,
        }
    }

    /// Create a sine oscillator at 440 Hz; it is silent until started
    pub fn create_oscillator(&self) -> OscillatorNode {
        let id = self.graph().add(NodeKind::Oscillator(Oscillator::new(440.0)));
        OscillatorNode {
            context: self.clone(),
            id,
        }
    }

    /// Number of live nodes, the destination included
    pub fn node_count(&self) -> usize {
        self.graph().nodes.len()
    }

    /// Whether the node is still part of the graph
    pub fn contains(&self, id: NodeId) -> bool {
        self.graph().nodes.contains_key(&id)
    }

    /// Render mono samples into `out`, advancing the clock
    pub fn render(&self, out: &mut [f32]) {
        self.graph().render(out);
    }

    /// Render without blocking.
    ///
    /// Returns `false` and leaves `out` untouched when the graph is busy.
    pub fn try_render(&self, out: &mut [f32]) -> bool {
        let mut graph = match self.inner.try_lock() {
            Ok(graph) => graph,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        graph.render(out);
        true
    }

    fn same_graph(&self, other: &AudioContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Common behaviour of node handles
pub trait AudioNode {
    /// Node identifier
    fn id(&self) -> NodeId;

    /// Context the node belongs to
    fn context(&self) -> &AudioContext;

    /// Route this node's output into `destination`.
    ///
    /// Connections across contexts, into oscillators, or that would form a
    /// cycle are ignored.
    fn connect(&self, destination: &dyn AudioNode) {
        if !self.context().same_graph(destination.context()) {
            log::warn!("ignoring connection between different audio contexts");
            return;
        }
        if !self.context().graph().connect(self.id(), destination.id()) {
            log::warn!("ignoring invalid connection {:?} -> {:?}", self.id(), destination.id());
        }
    }

    /// Remove every outgoing connection.
    ///
    /// A node left with no connections at all is released from the graph.
    fn disconnect(&self) {
        self.context().graph().disconnect(self.id());
    }
}

/// Handle to the context destination
#[derive(Debug, Clone)]
pub struct DestinationNode {
    context: AudioContext,
    id: NodeId,
}

impl AudioNode for DestinationNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn context(&self) -> &AudioContext {
        &self.context
    }

    fn disconnect(&self) {}
}

/// Handle to a gain node
#[derive(Debug, Clone)]
pub struct GainNode {
    context: AudioContext,
    id: NodeId,
}

impl GainNode {
    /// The gain parameter
    pub fn gain(&self) -> ParamRef<'_> {
        ParamRef {
            context: &self.context,
            node: self.id,
            name: ParamName::Gain,
        }
    }
}

impl AudioNode for GainNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn context(&self) -> &AudioContext {
        &self.context
    }
}

/// Handle to a sine oscillator node
#[derive(Debug, Clone)]
pub struct OscillatorNode {
    context: AudioContext,
    id: NodeId,
}

impl OscillatorNode {
    /// The frequency parameter, in Hz
    pub fn frequency(&self) -> ParamRef<'_> {
        ParamRef {
            context: &self.context,
            node: self.id,
            name: ParamName::Frequency,
        }
    }

    /// Start sounding at the current context time
    pub fn start(&self) {
        let mut graph = self.context.graph();
        let now = graph.current_time();
        if let Some(osc) = graph.oscillator_mut(self.id) {
            osc.start(now);
        }
    }

    /// Stop sounding at the current context time
    pub fn stop(&self) {
        let mut graph = self.context.graph();
        let now = graph.current_time();
        if let Some(osc) = graph.oscillator_mut(self.id) {
            osc.stop(now);
        }
    }

    /// Whether `stop` has been called on a live node
    pub fn is_stopped(&self) -> bool {
        self.context
            .graph()
            .oscillator_mut(self.id)
            .map(|osc| osc.is_stopped())
            .unwrap_or(false)
    }
}

impl AudioNode for OscillatorNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn context(&self) -> &AudioContext {
        &self.context
    }
}

/// Borrowed view of one node parameter.
///
/// Every call locks the graph briefly. Calls on a released node do nothing
/// and read as zero.
#[derive(Debug, Clone, Copy)]
pub struct ParamRef<'a> {
    context: &'a AudioContext,
    node: NodeId,
    name: ParamName,
}

impl ParamRef<'_> {
    fn with<R>(&self, f: impl FnOnce(&mut AudioParam, f64) -> R) -> Option<R> {
        let mut graph = self.context.graph();
        let now = graph.current_time();
        graph.param_mut(self.node, self.name).map(|param| f(param, now))
    }

    /// Value at the current context time
    pub fn value(&self) -> f32 {
        self.with(|param, now| param.value_at(now)).unwrap_or(0.0)
    }

    /// Value at an arbitrary time
    pub fn value_at(&self, time: f64) -> f32 {
        self.with(|param, _| param.value_at(time)).unwrap_or(0.0)
    }

    /// Set the intrinsic value
    pub fn set_value(&self, value: f32) {
        self.with(|param, _| param.set_value(value));
    }

    /// Schedule a jump to `value` at `time`
    pub fn set_value_at_time(&self, value: f32, time: f64) {
        self.with(|param, _| param.set_value_at_time(value, time));
    }

    /// Schedule an exponential ramp reaching `value` at `end_time`
    pub fn exponential_ramp_to_value_at_time(&self, value: f32, end_time: f64) {
        self.with(|param, _| param.exponential_ramp_to_value_at_time(value, end_time));
    }
}

//! Software audio graph
//!
//! A small node graph in the shape of a browser audio API: oscillators and
//! gains wired into a destination, with automatable parameters scheduled
//! against the context clock.

mod context;
mod node;
mod param;

pub use context::{AudioContext, AudioNode, DestinationNode, GainNode, OscillatorNode, ParamRef};
pub use node::NodeId;
pub use param::{AudioParam, ParamEvent};

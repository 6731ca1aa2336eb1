//! Node hierarchy the animation core writes poses into.

pub mod node;

pub use node::Node;

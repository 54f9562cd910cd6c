//! Integration flows across fc-01 and shared-bus.

mod coordinator_flow;
mod engine_equivalence;
mod locality_flow;

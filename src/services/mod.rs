pub mod apply_sequencer;
pub mod change_detector;
pub mod gateway;
pub mod lifecycle;
pub mod linode_client;
pub mod resource;
pub mod state_reader;
pub mod state_store;
#[cfg(test)]
pub mod testkit;

pub mod coordinator;
pub mod queue;
pub mod sweep;
pub mod worker;

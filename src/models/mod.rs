pub mod order;
pub mod result;
pub mod rider;

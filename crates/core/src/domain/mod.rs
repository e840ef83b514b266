pub mod booking;
pub mod employee;
pub mod fuel;
pub mod vehicle;
pub mod workflow;

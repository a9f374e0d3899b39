pub mod allocation;
pub mod weightage;

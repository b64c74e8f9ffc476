pub mod dashboard;
pub mod group_detail;
pub mod groups;
pub mod payroll;
pub mod reports;
pub mod statistics;
pub mod transactions;

pub mod dashboard;
pub mod machine;
pub mod metrics;
pub mod operator;
pub mod product;
pub mod production;
pub mod report;
pub mod session;

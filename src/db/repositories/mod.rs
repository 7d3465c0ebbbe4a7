pub mod machine_repository;
pub mod operator_repository;
pub mod product_repository;
pub mod production_repository;

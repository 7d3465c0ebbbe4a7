pub mod crypto;
pub mod dates;
pub mod logger;

pub mod catalog_service;
pub mod dashboard_service;
pub mod metrics_service;
pub mod pdf_export;
pub mod production_service;
pub mod realtime;
pub mod report_service;
pub mod session_service;
pub mod spreadsheet;
pub mod targets;

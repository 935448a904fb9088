pub mod aggregator_service;
pub mod brief_service;
pub mod ingest_service;
pub mod job_scheduler_service;
pub mod recommendation_service;

pub mod analytics_service;
pub mod application_service;
pub mod interview_service;
pub mod queue_service;
pub mod scoring_service;

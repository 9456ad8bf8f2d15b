pub mod analytics_dto;
pub mod application_dto;
pub mod interview_dto;

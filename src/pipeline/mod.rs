pub mod capability;
pub mod compress;
pub mod deadline;
pub mod job_runner;
pub mod orchestrator;
pub mod page_processor;

pub mod agents;
pub mod run;
pub mod version;

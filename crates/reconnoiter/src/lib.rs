pub mod agent;
pub mod agents;
pub mod docker;
pub mod errors;
pub mod model_id;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod registry;
pub mod run;
pub mod systems;

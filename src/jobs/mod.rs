use crate::app_context::AppContext;

mod definitions_reload;

pub use definitions_reload::load_initial_definitions;

pub fn start_background_jobs(app_context: AppContext) {
    definitions_reload::start_definitions_hot_reload_job(app_context);
}

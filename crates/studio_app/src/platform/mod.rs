mod app;
mod effects;
mod jobs;
pub(crate) mod logging;
mod persistence;
mod ui;

pub(crate) use app::run_app;

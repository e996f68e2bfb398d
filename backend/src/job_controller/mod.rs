pub mod dispatcher;
pub mod runner;
pub mod state;

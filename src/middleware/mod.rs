pub mod auth;
pub mod prelaunch;

pub mod auth_token;
pub mod project_assignment;
pub mod project_photo;
pub mod project_update;
pub mod road_project;
pub mod road_segment;
pub mod user;

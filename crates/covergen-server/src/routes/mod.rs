pub mod covers;
pub mod events;
pub mod genres;
pub mod projects;
pub mod runs;

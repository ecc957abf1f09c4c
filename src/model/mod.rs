pub mod config;
pub mod graph;
pub mod physics;
pub mod scene;
pub mod spatial;
pub mod world;

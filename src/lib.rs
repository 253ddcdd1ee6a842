// Articulated robot and room drawn through a hierarchical scene graph

pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod light;
pub mod math;
pub mod matrix_stack;
pub mod model;
pub mod obj;
pub mod pose;
pub mod renderer;
pub mod robot;
pub mod scene;

//! ECS components shared by the pipeline phases
//!
//! - physics: PhysicsValues, PhysicsBody, BoundingBox, CollisionFilter, TimeToLive
//! - player: Player marker

pub mod physics;
pub mod player;

pub use physics::*;
pub use player::*;

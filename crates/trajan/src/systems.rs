//! # Built-in Systems
//!
//! Execution order is registration order. [`MotionSystem`] is registered by
//! [`Engine::new`](crate::Engine::new); [`RenderSystem`] by
//! [`Engine::initialize`](crate::Engine::initialize), after any game systems,
//! so it always draws the final state of the frame.

use tracing::warn;
use trajan_core::{System, SystemFrame};

use crate::components::{Sprite, Transform2D, Velocity2D};
use crate::engine::EngineContext;

/// Integrates [`Velocity2D`] into [`Transform2D`].
#[derive(Debug, Default)]
pub struct MotionSystem;

impl System<EngineContext> for MotionSystem {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn update(&mut self, mut frame: SystemFrame<'_, EngineContext>) {
        let dt = frame.dt;
        for &entity in frame.entities {
            let Ok(velocity) = frame.components.get::<Velocity2D>(entity).copied() else {
                continue;
            };
            if let Ok(transform) = frame.components.get_mut::<Transform2D>(entity) {
                transform.position += velocity.linear * dt;
                transform.rotation += velocity.angular * dt;
            }
        }
    }
}

/// Submits one draw per entity with a [`Transform2D`] and a [`Sprite`].
#[derive(Debug, Default)]
pub struct RenderSystem {
    submitted: usize,
    skipped: usize,
}

impl RenderSystem {
    /// Draws submitted during the last update.
    #[must_use]
    pub const fn submitted(&self) -> usize {
        self.submitted
    }

    /// Members skipped during the last update because an asset or GPU handle
    /// did not resolve.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}

impl System<EngineContext> for RenderSystem {
    fn name(&self) -> &'static str {
        "render"
    }

    fn update(&mut self, frame: SystemFrame<'_, EngineContext>) {
        self.submitted = 0;
        self.skipped = 0;

        for &entity in frame.entities {
            let (Ok(transform), Ok(sprite)) = (
                frame.components.get::<Transform2D>(entity),
                frame.components.get::<Sprite>(entity),
            ) else {
                continue;
            };

            match frame.context.draw(sprite, transform.matrix()) {
                Ok(()) => self.submitted += 1,
                Err(error) => {
                    self.skipped += 1;
                    warn!(%entity, %error, "sprite not drawn");
                }
            }
        }
    }
}

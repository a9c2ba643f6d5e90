//! # Systems
//!
//! A system is behavior bound to one or more aspects. The scheduler turns
//! each aspect into a live collection when the system is registered and
//! hands the collection ids back through [`TickContext`] on every tick.
//!
//! Two shapes are supported:
//!
//! - [`System`]: the handler receives the whole world and drives its own
//!   iteration over `ctx.collections`.
//! - [`EntitySystem`]: the handler is called once per member of its
//!   collection. Register it with
//!   [`Engine::add_entity_system`](crate::Engine::add_entity_system).
//!
//! Every hook receives `&mut World`, never the scheduler, so a system cannot
//! register or remove systems from inside a tick.

use std::time::Duration;

use crate::ecs::{Aspect, CollectionId, ComponentSet, EntityId, World};
use crate::error::SystemResult;
use crate::events::Message;

/// Per-tick information handed to system hooks.
#[derive(Clone, Copy, Debug)]
pub struct TickContext<'a> {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Simulated time step of this tick.
    pub delta: Duration,
    /// Collections for [`System::aspects`], in declaration order.
    pub collections: &'a [CollectionId],
}

impl TickContext<'_> {
    /// Δ in seconds.
    #[inline]
    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// The collection of the first declared aspect.
    #[inline]
    #[must_use]
    pub fn primary(&self) -> Option<CollectionId> {
        self.collections.first().copied()
    }
}

/// A whole-collection system.
///
/// # Example
///
/// ```rust,ignore
/// struct Census;
///
/// impl System<Components> for Census {
///     fn name(&self) -> &str { "census" }
///
///     fn aspects(&self) -> Vec<Aspect> {
///         vec![Aspect::new().with::<Components, Position>()]
///     }
///
///     fn update(&mut self, ctx: &TickContext<'_>, world: &mut World<Components>) -> SystemResult {
///         let alive = world.view(ctx.collections[0])?.len();
///         tracing::info!(alive, "census");
///         Ok(())
///     }
/// }
/// ```
pub trait System<S: ComponentSet, M: Message = ()>: Send {
    /// Unique name. Registering a second system with the same name fails.
    fn name(&self) -> &str;

    /// Aspects this system reads. Each becomes a live collection.
    fn aspects(&self) -> Vec<Aspect> {
        Vec::new()
    }

    /// Called once when the system is added, after its collections exist.
    ///
    /// # Errors
    ///
    /// A failure cancels the registration.
    fn on_register(&mut self, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }

    /// Called once when the system is removed.
    ///
    /// # Errors
    ///
    /// Reported to the caller of `remove_system`; the system is removed
    /// regardless.
    fn on_unregister(&mut self, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }

    /// Runs before [`update`](Self::update) on every tick.
    ///
    /// # Errors
    ///
    /// Aborts the tick.
    fn on_pre_update(&mut self, _ctx: &TickContext<'_>, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }

    /// The per-tick handler.
    ///
    /// # Errors
    ///
    /// Aborts the tick.
    fn update(&mut self, ctx: &TickContext<'_>, world: &mut World<S, M>) -> SystemResult;

    /// Runs after [`update`](Self::update) on every tick.
    ///
    /// # Errors
    ///
    /// Aborts the tick.
    fn on_post_update(&mut self, _ctx: &TickContext<'_>, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }
}

/// A per-entity system over a single aspect.
pub trait EntitySystem<S: ComponentSet, M: Message = ()>: Send {
    /// Unique name.
    fn name(&self) -> &str;

    /// The aspect whose members are visited.
    fn aspect(&self) -> Aspect;

    /// See [`System::on_register`].
    ///
    /// # Errors
    ///
    /// A failure cancels the registration.
    fn on_register(&mut self, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }

    /// See [`System::on_unregister`].
    ///
    /// # Errors
    ///
    /// Reported to the caller of `remove_system`.
    fn on_unregister(&mut self, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }

    /// See [`System::on_pre_update`].
    ///
    /// # Errors
    ///
    /// Aborts the tick.
    fn on_pre_update(&mut self, _ctx: &TickContext<'_>, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }

    /// Called for every member of the collection, in order.
    ///
    /// The visited sequence is fixed when the tick reaches this system;
    /// members destroyed along the way are skipped.
    ///
    /// # Errors
    ///
    /// The first error stops the iteration and aborts the tick.
    fn update_entity(
        &mut self,
        ctx: &TickContext<'_>,
        world: &mut World<S, M>,
        entity: EntityId,
    ) -> SystemResult;

    /// See [`System::on_post_update`].
    ///
    /// # Errors
    ///
    /// Aborts the tick.
    fn on_post_update(&mut self, _ctx: &TickContext<'_>, _world: &mut World<S, M>) -> SystemResult {
        Ok(())
    }
}

/// Adapts an [`EntitySystem`] into a [`System`] that iterates its
/// collection.
#[derive(Debug)]
pub struct ForEach<T>(pub T);

impl<S, M, T> System<S, M> for ForEach<T>
where
    S: ComponentSet,
    M: Message,
    T: EntitySystem<S, M>,
{
    fn name(&self) -> &str {
        self.0.name()
    }

    fn aspects(&self) -> Vec<Aspect> {
        vec![self.0.aspect()]
    }

    fn on_register(&mut self, world: &mut World<S, M>) -> SystemResult {
        self.0.on_register(world)
    }

    fn on_unregister(&mut self, world: &mut World<S, M>) -> SystemResult {
        self.0.on_unregister(world)
    }

    fn on_pre_update(&mut self, ctx: &TickContext<'_>, world: &mut World<S, M>) -> SystemResult {
        self.0.on_pre_update(ctx, world)
    }

    fn update(&mut self, ctx: &TickContext<'_>, world: &mut World<S, M>) -> SystemResult {
        let Some(collection) = ctx.primary() else {
            return Ok(());
        };
        let inner = &mut self.0;
        world.each(collection, |world, entity| inner.update_entity(ctx, world, entity))
    }

    fn on_post_update(&mut self, ctx: &TickContext<'_>, world: &mut World<S, M>) -> SystemResult {
        self.0.on_post_update(ctx, world)
    }
}

//! Component enumeration and systems shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tessera_core::{
    Component, ComponentKind, ComponentSet, KindInfo, System, SystemResult, TickContext, World,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Kinds {
    Position(Position),
}

impl ComponentSet for Kinds {
    const KINDS: &'static [KindInfo] = &[KindInfo::new(0, "Position")];

    fn kind(&self) -> ComponentKind {
        match self {
            Self::Position(_) => Position::KIND,
        }
    }
}

impl Component<Kinds> for Position {
    const KIND: ComponentKind = ComponentKind::new(0);

    fn into_set(self) -> Kinds {
        Kinds::Position(self)
    }

    fn from_set(value: &Kinds) -> Option<&Self> {
        match value {
            Kinds::Position(p) => Some(p),
        }
    }
}

/// Records the delta of every tick it sees.
#[derive(Default)]
pub struct Counter {
    deltas: Arc<Mutex<Vec<Duration>>>,
}

impl Counter {
    pub fn deltas(&self) -> Arc<Mutex<Vec<Duration>>> {
        Arc::clone(&self.deltas)
    }
}

impl System<Kinds> for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn update(&mut self, ctx: &TickContext<'_>, _: &mut World<Kinds>) -> SystemResult {
        self.deltas.lock().push(ctx.delta);
        Ok(())
    }
}

//! Component enumeration and helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::{Component, ComponentKind, ComponentSet, Engine, Event, KindInfo, Topic};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, theta: f32) -> Self {
        Self { x, y, theta }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
    pub omega: f32,
}

impl Velocity {
    pub const fn new(vx: f32, vy: f32, omega: f32) -> Self {
        Self { vx, vy, omega }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Green,
    Blue,
    Red,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mesh(pub String);

#[derive(Clone, Debug, PartialEq)]
pub enum Components {
    Position(Position),
    Velocity(Velocity),
    Color(Color),
    Mesh(Mesh),
}

impl ComponentSet for Components {
    const KINDS: &'static [KindInfo] = &[
        KindInfo::new(0, "Position"),
        KindInfo::new(1, "Velocity"),
        KindInfo::new(2, "Color"),
        KindInfo::new(3, "Mesh"),
    ];

    fn kind(&self) -> ComponentKind {
        match self {
            Self::Position(_) => Position::KIND,
            Self::Velocity(_) => Velocity::KIND,
            Self::Color(_) => Color::KIND,
            Self::Mesh(_) => Mesh::KIND,
        }
    }
}

macro_rules! component {
    ($ty:ident, $tag:expr) => {
        impl Component<Components> for $ty {
            const KIND: ComponentKind = ComponentKind::new($tag);

            fn into_set(self) -> Components {
                Components::$ty(self)
            }

            fn from_set(value: &Components) -> Option<&Self> {
                match value {
                    Components::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

component!(Position, 0);
component!(Velocity, 1);
component!(Color, 2);
component!(Mesh, 3);

/// Every kind, in tag order.
pub const ALL_KINDS: [ComponentKind; 4] = [
    Position::KIND,
    Velocity::KIND,
    Color::KIND,
    Mesh::KIND,
];

pub type TestEngine = Engine<Components>;

pub fn engine() -> TestEngine {
    Engine::new().expect("valid component table")
}

/// Shared, cloneable log for hooks and handlers.
pub type Log<T> = Arc<Mutex<Vec<T>>>;

pub fn log<T>() -> Log<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Records every event on `topics` into a fresh log.
pub fn record(engine: &mut TestEngine, topics: &[Topic]) -> Log<Event> {
    let events = log();
    for &topic in topics {
        let sink = Arc::clone(&events);
        engine.subscribe(topic, move |event| sink.lock().push(event.clone()));
    }
    events
}

/// Payload of every kind, for exercising arbitrary kinds.
pub fn sample(kind: ComponentKind, seed: u32) -> Components {
    let f = seed as f32;
    match kind.tag() {
        0 => Components::Position(Position::new(f, -f, 0.5 * f)),
        1 => Components::Velocity(Velocity::new(-f, f, 1.0)),
        2 => Components::Color(match seed % 3 {
            0 => Color::Green,
            1 => Color::Blue,
            _ => Color::Red,
        }),
        _ => Components::Mesh(Mesh(format!("mesh-{seed}"))),
    }
}

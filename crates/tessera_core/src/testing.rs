//! Component enumeration shared by the unit tests.

use crate::ecs::{Component, ComponentKind, ComponentSet, KindInfo};

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

impl Component<Components> for Position {
    const KIND: ComponentKind = ComponentKind::new(0);

    fn into_set(self) -> Components {
        Components::Position(self)
    }

    fn from_set(value: &Components) -> Option<&Self> {
        match value {
            Components::Position(p) => Some(p),
            _ => None,
        }
    }
}

impl Component<Components> for Velocity {
    const KIND: ComponentKind = ComponentKind::new(1);

    fn into_set(self) -> Components {
        Components::Velocity(self)
    }

    fn from_set(value: &Components) -> Option<&Self> {
        match value {
            Components::Velocity(v) => Some(v),
            _ => None,
        }
    }
}

impl Component<Components> for Color {
    const KIND: ComponentKind = ComponentKind::new(2);

    fn into_set(self) -> Components {
        Components::Color(self)
    }

    fn from_set(value: &Components) -> Option<&Self> {
        match value {
            Components::Color(c) => Some(c),
            _ => None,
        }
    }
}

impl Component<Components> for Mesh {
    const KIND: ComponentKind = ComponentKind::new(3);

    fn into_set(self) -> Components {
        Components::Mesh(self)
    }

    fn from_set(value: &Components) -> Option<&Self> {
        match value {
            Components::Mesh(m) => Some(m),
            _ => None,
        }
    }
}

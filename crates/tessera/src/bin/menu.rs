//! # Tessera Menu
//!
//! Headless button menu driven by a scripted pointer.
//!
//! Buttons carry no base color. Each defines `normal`, `hover` and `pressed`
//! overlays that supply one; the render pass only sees buttons whose active
//! overlay gives them a color. A press released over a button publishes a
//! click message, and clicking `Quit` ends the loop.
//!
//! ```bash
//! RUST_LOG=debug cargo run --bin menu
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tessera::core::{
    Aspect, Component, ComponentKind, ComponentSet, EcsResult, Engine, EntityId, Event, KindInfo,
    Message, System, SystemResult, TickContext, Topic, World,
};
use tessera::{GameLoop, GameLoopConfig, RuntimeResult};
use tracing::{debug, info};

const NORMAL: &str = "normal";
const HOVER: &str = "hover";
const PRESSED: &str = "pressed";

/// Hard stop if nobody clicks `Quit`.
const MAX_FRAMES: u64 = 1_200;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Size {
    w: f32,
    h: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Color {
    r: u8,
    g: u8,
    b: u8,
}

impl Color {
    const GREEN: Self = Self { r: 40, g: 160, b: 60 };
    const BLUE: Self = Self { r: 50, g: 90, b: 200 };
    const RED: Self = Self { r: 200, g: 40, b: 40 };
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Label(String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Start,
    Options,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Button {
    action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cursor {
    x: f32,
    y: f32,
    down: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum Parts {
    Position(Position),
    Size(Size),
    Color(Color),
    Label(Label),
    Button(Button),
    Cursor(Cursor),
}

impl ComponentSet for Parts {
    const KINDS: &'static [KindInfo] = &[
        KindInfo::new(0, "Position"),
        KindInfo::new(1, "Size"),
        KindInfo::new(2, "Color"),
        KindInfo::new(3, "Label"),
        KindInfo::new(4, "Button"),
        KindInfo::new(5, "Cursor"),
    ];

    fn kind(&self) -> ComponentKind {
        match self {
            Self::Position(_) => Position::KIND,
            Self::Size(_) => Size::KIND,
            Self::Color(_) => Color::KIND,
            Self::Label(_) => Label::KIND,
            Self::Button(_) => Button::KIND,
            Self::Cursor(_) => Cursor::KIND,
        }
    }
}

macro_rules! component {
    ($ty:ident, $tag:expr) => {
        impl Component<Parts> for $ty {
            const KIND: ComponentKind = ComponentKind::new($tag);

            fn into_set(self) -> Parts {
                Parts::$ty(self)
            }

            fn from_set(value: &Parts) -> Option<&Self> {
                match value {
                    Parts::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

component!(Position, 0);
component!(Size, 1);
component!(Color, 2);
component!(Label, 3);
component!(Button, 4);
component!(Cursor, 5);

/// Messages the menu publishes on its own topics.
#[derive(Clone, Debug, PartialEq)]
enum MenuMessage {
    Clicked { button: EntityId, action: Action },
}

impl MenuMessage {
    const CLICKED: u32 = 1;
}

impl Message for MenuMessage {
    fn topic(&self) -> u32 {
        match self {
            Self::Clicked { .. } => Self::CLICKED,
        }
    }
}

type MenuWorld = World<Parts, MenuMessage>;

// =============================================================================
// Systems
// =============================================================================

/// Moves the cursor through a fixed list of waypoints.
struct Pointer {
    script: Vec<(f32, Cursor)>,
    elapsed: f32,
}

impl System<Parts, MenuMessage> for Pointer {
    fn name(&self) -> &str {
        "pointer"
    }

    fn aspects(&self) -> Vec<Aspect> {
        vec![Aspect::new().with::<Parts, Cursor>()]
    }

    fn update(&mut self, ctx: &TickContext<'_>, world: &mut MenuWorld) -> SystemResult {
        self.elapsed += ctx.delta_seconds();
        let Some(at) = self
            .script
            .iter()
            .take_while(|(start, _)| *start <= self.elapsed)
            .last()
            .map(|&(_, cursor)| cursor)
        else {
            return Ok(());
        };
        let Some(cursors) = ctx.primary() else {
            return Ok(());
        };
        for cursor in world.view(cursors)?.entities() {
            world.insert(cursor, at)?;
        }
        Ok(())
    }
}

/// Picks each button's overlay from the cursor and reports clicks.
struct Hover;

impl System<Parts, MenuMessage> for Hover {
    fn name(&self) -> &str {
        "hover"
    }

    fn aspects(&self) -> Vec<Aspect> {
        vec![
            Aspect::new()
                .with::<Parts, Button>()
                .with::<Parts, Position>()
                .with::<Parts, Size>(),
            Aspect::new().with::<Parts, Cursor>(),
        ]
    }

    fn update(&mut self, ctx: &TickContext<'_>, world: &mut MenuWorld) -> SystemResult {
        let &[buttons, cursors] = ctx.collections else {
            return Ok(());
        };
        let Some(cursor) = world.first(cursors)? else {
            return Ok(());
        };
        let Some(Cursor { x, y, down }) = world.component::<Cursor>(cursor)? else {
            return Ok(());
        };

        for button in world.entities(buttons)? {
            let (Some(p), Some(size), Some(Button { action })) = (
                world.component::<Position>(button)?,
                world.component::<Size>(button)?,
                world.component::<Button>(button)?,
            ) else {
                continue;
            };
            let inside = x >= p.x && x < p.x + size.w && y >= p.y && y < p.y + size.h;
            let next = match (inside, down) {
                (true, true) => PRESSED,
                (true, false) => HOVER,
                (false, _) => NORMAL,
            };

            let was_pressed = world.active_state(button)? == Some(PRESSED);
            if was_pressed && next == HOVER {
                world.publish(MenuMessage::Clicked { button, action });
            }
            world.change_state(button, Some(next))?;
        }
        Ok(())
    }
}

/// Logs what a renderer would draw.
struct Render {
    every: u64,
}

impl System<Parts, MenuMessage> for Render {
    fn name(&self) -> &str {
        "render"
    }

    fn aspects(&self) -> Vec<Aspect> {
        vec![Aspect::new()
            .with::<Parts, Position>()
            .with::<Parts, Color>()
            .with::<Parts, Label>()]
    }

    fn update(&mut self, ctx: &TickContext<'_>, world: &mut MenuWorld) -> SystemResult {
        if ctx.tick % self.every != 0 {
            return Ok(());
        }
        let Some(visible) = ctx.primary() else {
            return Ok(());
        };
        for entity in world.entities(visible)? {
            let (Some(Label(text)), Some(color)) = (
                world.component::<Label>(entity)?,
                world.component::<Color>(entity)?,
            ) else {
                continue;
            };
            let state = world.active_state(entity)?;
            debug!(tick = ctx.tick, %text, ?color, ?state, "draw");
        }
        Ok(())
    }
}

fn button(
    engine: &mut Engine<Parts, MenuMessage>,
    text: &str,
    action: Action,
    y: f32,
) -> EcsResult<EntityId> {
    let id = engine.create_named(text);
    engine.insert(id, Position { x: 100.0, y })?;
    engine.insert(id, Size { w: 200.0, h: 40.0 })?;
    engine.insert(id, Label(text.to_owned()))?;
    engine.insert(id, Button { action })?;
    for (state, color) in [
        (NORMAL, Color::GREEN),
        (HOVER, Color::BLUE),
        (PRESSED, Color::RED),
    ] {
        engine.define_state(id, state, vec![Parts::Color(color)])?;
    }
    engine.change_state(id, Some(NORMAL))?;
    Ok(id)
}

/// Hover `Start`, click `Options`, wander off, then click `Quit`.
fn script() -> Vec<(f32, Cursor)> {
    let at = |x, y, down| Cursor { x, y, down };
    vec![
        (0.0, at(10.0, 10.0, false)),
        (0.5, at(150.0, 120.0, false)),
        (1.0, at(150.0, 180.0, false)),
        (1.5, at(150.0, 180.0, true)),
        (1.7, at(150.0, 180.0, false)),
        (2.2, at(500.0, 400.0, false)),
        (2.7, at(150.0, 235.0, false)),
        (3.0, at(150.0, 235.0, true)),
        (3.2, at(150.0, 235.0, false)),
    ]
}

fn main() -> RuntimeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => GameLoopConfig::from_toml_file(path)?,
        None => GameLoopConfig::default(),
    };
    let mut game = GameLoop::<Parts, MenuMessage>::new(config)?;
    let engine = game.engine_mut();

    for (y, text, action) in [
        (100.0, "Start", Action::Start),
        (160.0, "Options", Action::Options),
        (220.0, "Quit", Action::Quit),
    ] {
        button(engine, text, action, y)?;
    }
    let cursor = engine.create_named("cursor");
    engine.insert(
        cursor,
        Cursor {
            x: 0.0,
            y: 0.0,
            down: false,
        },
    )?;

    let quit = Arc::new(AtomicBool::new(false));
    let quit_flag = Arc::clone(&quit);
    engine.subscribe(Topic::Custom(MenuMessage::CLICKED), move |event| {
        if let Event::Custom(MenuMessage::Clicked { button, action }) = event {
            info!(%button, ?action, "clicked");
            if *action == Action::Quit {
                quit_flag.store(true, Ordering::Relaxed);
            }
        }
    });
    engine.subscribe(Topic::StateChanged, |event| {
        if let Event::StateChanged { entity, state } = event {
            debug!(%entity, ?state, "state changed");
        }
    });

    engine.add_system(
        Pointer {
            script: script(),
            elapsed: 0.0,
        },
        0,
    )?;
    engine.add_system(Hover, 1)?;
    engine.add_system(Render { every: 15 }, 10)?;

    while !quit.load(Ordering::Relaxed) && game.frame_count() < MAX_FRAMES {
        game.frame(game.step())?;
    }
    info!(
        frames = game.frame_count(),
        quit = quit.load(Ordering::Relaxed),
        "menu closed"
    );
    game.stats().log_summary();
    game.into_engine().shutdown()?;
    Ok(())
}

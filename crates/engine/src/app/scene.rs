use std::fmt;

use thiserror::Error;

use super::config::EngineConfig;
use super::input::InputState;
use super::rendering::{Color, DrawSurface, Font};

pub const DEFAULT_TEXT_FONT: &str = "14px Verdana";
pub const DEFAULT_TEXT_COLOR: Color = Color::rgb(0x55, 0x55, 0x55);
const FPS_OVERLAY_RIGHT_INSET: f32 = 100.0;
const FPS_OVERLAY_BASELINE_Y: f32 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure raised by an entity from `update` or `render`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EntityFault {
    message: String,
}

impl EntityFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Update,
    Render,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPhase::Update => f.write_str("update"),
            DispatchPhase::Render => f.write_str("render"),
        }
    }
}

/// An entity fault tagged with where it happened. Aborts the rest of the tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entity `{key}` failed during {phase}: {source}")]
pub struct DispatchError {
    pub key: EntityKey,
    pub phase: DispatchPhase,
    #[source]
    pub source: EntityFault,
}

/// What the update phase hands each entity. Borrowed for one tick only.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    pub config: &'a EngineConfig,
    pub input: &'a InputState,
    pub fps: f64,
    pub now_ms: f64,
    /// Generation the state will carry once this update phase completes.
    pub generation: u64,
}

/// What the render phase hands each entity. Borrowed for one tick only.
pub struct RenderContext<'a> {
    pub config: &'a EngineConfig,
    pub input: &'a InputState,
    pub fps: f64,
    pub state: &'a SimulationState,
    pub surface: &'a mut dyn DrawSurface,
}

impl RenderContext<'_> {
    /// Draws `text` with a CSS-style font (`"14px Verdana"`) and hex color
    /// (`"#555"`), clipped to the canvas width. Missing or unparseable
    /// values fall back to [`DEFAULT_TEXT_FONT`] and [`DEFAULT_TEXT_COLOR`].
    pub fn text(&mut self, x: f32, y: f32, text: &str, font: Option<&str>, color: Option<&str>) {
        let font = font
            .and_then(Font::parse)
            .or_else(|| Font::parse(DEFAULT_TEXT_FONT))
            .unwrap_or_default();
        let color = color
            .and_then(Color::from_hex)
            .unwrap_or(DEFAULT_TEXT_COLOR);
        self.surface.set_font(font);
        self.surface.set_fill_style(color);
        self.surface.fill_text(text, x, y, Some(self.config.width as f32));
    }
}

pub trait Entity {
    /// Mutates only this entity's own fields. Must not depend on the order
    /// siblings are updated in.
    fn update(&mut self, ctx: &UpdateContext<'_>) -> Result<(), EntityFault>;

    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), EntityFault>;
}

/// Keyed entities in insertion order. Re-inserting a key keeps its slot.
#[derive(Default)]
pub struct EntityRegistry {
    entries: Vec<(EntityKey, Box<dyn Entity>)>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entity previously stored under `key`, if any.
    pub fn insert(
        &mut self,
        key: impl Into<EntityKey>,
        entity: Box<dyn Entity>,
    ) -> Option<Box<dyn Entity>> {
        let key = key.into();
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, entity)),
            None => {
                self.entries.push((key, entity));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &EntityKey) -> Option<Box<dyn Entity>> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &EntityKey) -> Option<&dyn Entity> {
        let index = self.position(key)?;
        Some(self.entries[index].1.as_ref())
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.position(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &EntityKey) -> Option<usize> {
        self.entries.iter().position(|(existing, _)| existing == key)
    }

    fn iter(&self) -> impl Iterator<Item = (&EntityKey, &dyn Entity)> {
        self.entries.iter().map(|(key, entity)| (key, entity.as_ref()))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (&EntityKey, &mut Box<dyn Entity>)> {
        self.entries.iter_mut().map(|(key, entity)| (&*key, entity))
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Everything the loop simulates. A registry only exists once something was
/// spawned; until then both phases dispatch nothing.
#[derive(Debug, Default)]
pub struct SimulationState {
    entities: Option<EntityRegistry>,
    generation: u64,
}

impl SimulationState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> Option<&EntityRegistry> {
        self.entities.as_ref()
    }

    /// Creates the registry on first use.
    pub fn entities_mut(&mut self) -> &mut EntityRegistry {
        self.entities.get_or_insert_with(EntityRegistry::new)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.as_ref().map_or(0, EntityRegistry::len)
    }

    /// Number of completed update phases.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Runs `update` on every entity in insertion order, producing the next
/// generation of `state`. The first fault stops the phase and leaves the
/// generation where it was.
pub fn update_phase(
    state: &mut SimulationState,
    config: &EngineConfig,
    input: &InputState,
    fps: f64,
    now_ms: f64,
) -> Result<(), DispatchError> {
    let ctx = UpdateContext {
        config,
        input,
        fps,
        now_ms,
        generation: state.generation.wrapping_add(1),
    };

    if let Some(registry) = state.entities.as_mut() {
        for (key, entity) in registry.iter_mut() {
            entity.update(&ctx).map_err(|source| DispatchError {
                key: key.clone(),
                phase: DispatchPhase::Update,
                source,
            })?;
        }
    }

    state.generation = ctx.generation;
    Ok(())
}

/// Clears the canvas, draws the fps overlay when enabled, then renders every
/// entity in insertion order.
pub fn render_phase(ctx: &mut RenderContext<'_>) -> Result<(), DispatchError> {
    let width = ctx.config.width as f32;
    let height = ctx.config.height as f32;
    ctx.surface.clear_rect(0.0, 0.0, width, height);

    if ctx.config.show_fps {
        let label = format!("{:.2}", ctx.fps);
        ctx.text(
            width - FPS_OVERLAY_RIGHT_INSET,
            FPS_OVERLAY_BASELINE_Y,
            &label,
            None,
            None,
        );
    }

    let state = ctx.state;
    let Some(registry) = state.entities() else {
        return Ok(());
    };
    for (key, entity) in registry.iter() {
        entity.render(ctx).map_err(|source| DispatchError {
            key: key.clone(),
            phase: DispatchPhase::Render,
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Clear(f32, f32),
        Rect(f32, f32, f32, f32),
        Text(String, f32, f32),
        Font(String),
        Fill(Color),
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<Call>,
    }

    impl DrawSurface for RecordingSurface {
        fn clear_rect(&mut self, _x: f32, _y: f32, width: f32, height: f32) {
            self.calls.push(Call::Clear(width, height));
        }

        fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
            self.calls.push(Call::Rect(x, y, width, height));
        }

        fn fill_text(&mut self, text: &str, x: f32, y: f32, _max_width: Option<f32>) {
            self.calls.push(Call::Text(text.to_string(), x, y));
        }

        fn set_font(&mut self, font: Font) {
            self.calls.push(Call::Font(font.to_string()));
        }

        fn set_fill_style(&mut self, color: Color) {
            self.calls.push(Call::Fill(color));
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        log: Log,
        fail_update: bool,
        fail_render: bool,
        last_generation: u64,
    }

    impl Probe {
        fn boxed(name: &'static str, log: &Log) -> Box<dyn Entity> {
            Box::new(Self {
                name,
                log: Rc::clone(log),
                fail_update: false,
                fail_render: false,
                last_generation: 0,
            })
        }
    }

    impl Entity for Probe {
        fn update(&mut self, ctx: &UpdateContext<'_>) -> Result<(), EntityFault> {
            self.log
                .borrow_mut()
                .push(format!("update:{}:{}", self.name, ctx.generation));
            self.last_generation = ctx.generation;
            if self.fail_update {
                return Err(EntityFault::new("boom"));
            }
            Ok(())
        }

        fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), EntityFault> {
            assert_eq!(self.last_generation, ctx.state.generation());
            self.log
                .borrow_mut()
                .push(format!("render:{}:{}", self.name, ctx.state.generation()));
            if self.fail_render {
                return Err(EntityFault::new("paint"));
            }
            ctx.surface.fill_rect(0.0, 0.0, 1.0, 1.0);
            Ok(())
        }
    }

    fn render_with(
        config: &EngineConfig,
        state: &SimulationState,
        surface: &mut RecordingSurface,
    ) -> Result<(), DispatchError> {
        let input = InputState::default();
        let mut ctx = RenderContext {
            config,
            input: &input,
            fps: 23.96,
            state,
            surface,
        };
        render_phase(&mut ctx)
    }

    #[test]
    fn registry_keeps_insertion_order_and_slot_on_reinsert() {
        let log = Log::default();
        let mut registry = EntityRegistry::new();
        registry.insert("player", Probe::boxed("a", &log));
        registry.insert("enemy", Probe::boxed("b", &log));
        let previous = registry.insert("player", Probe::boxed("c", &log));

        assert!(previous.is_some());
        let keys: Vec<_> = registry.keys().map(EntityKey::as_str).collect();
        assert_eq!(keys, vec!["player", "enemy"]);

        assert!(registry.remove(&EntityKey::from("player")).is_some());
        assert!(registry.remove(&EntityKey::from("player")).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&"enemy".into()));
        assert!(registry.get(&"enemy".into()).is_some());
    }

    #[test]
    fn empty_state_dispatches_nothing() {
        let config = EngineConfig::default();
        let mut state = SimulationState::empty();
        assert!(state.entities().is_none());

        update_phase(&mut state, &config, &InputState::default(), 0.0, 0.0).expect("update");
        assert_eq!(state.generation(), 1);
        assert_eq!(state.entity_count(), 0);

        let mut surface = RecordingSurface::default();
        render_with(&config, &state, &mut surface).expect("render");
        assert_eq!(surface.calls, vec![Call::Clear(600.0, 600.0)]);
    }

    #[test]
    fn update_then_render_visit_entities_in_insertion_order() {
        let log = Log::default();
        let config = EngineConfig::default();
        let mut state = SimulationState::empty();
        state.entities_mut().insert("first", Probe::boxed("first", &log));
        state
            .entities_mut()
            .insert("second", Probe::boxed("second", &log));

        update_phase(&mut state, &config, &InputState::default(), 24.0, 50.0).expect("update");
        let mut surface = RecordingSurface::default();
        render_with(&config, &state, &mut surface).expect("render");

        assert_eq!(
            *log.borrow(),
            vec![
                "update:first:1",
                "update:second:1",
                "render:first:1",
                "render:second:1",
            ]
        );
    }

    #[test]
    fn update_fault_aborts_remaining_dispatch() {
        let log = Log::default();
        let config = EngineConfig::default();
        let mut state = SimulationState::empty();
        state.entities_mut().insert(
            "broken",
            Box::new(Probe {
                name: "broken",
                log: Rc::clone(&log),
                fail_update: true,
                fail_render: false,
                last_generation: 0,
            }),
        );
        state.entities_mut().insert("after", Probe::boxed("after", &log));

        let err = update_phase(&mut state, &config, &InputState::default(), 0.0, 0.0)
            .expect_err("must fail");
        assert_eq!(err.key.as_str(), "broken");
        assert_eq!(err.phase, DispatchPhase::Update);
        assert_eq!(
            err.to_string(),
            "entity `broken` failed during update: boom"
        );
        assert_eq!(state.generation(), 0);
        assert_eq!(state.entity_count(), 2);
        assert_eq!(*log.borrow(), vec!["update:broken:1"]);
    }

    #[test]
    fn render_fault_is_reported_with_key() {
        let log = Log::default();
        let config = EngineConfig::default();
        let mut state = SimulationState::empty();
        state.entities_mut().insert(
            "glitch",
            Box::new(Probe {
                name: "glitch",
                log: Rc::clone(&log),
                fail_update: false,
                fail_render: true,
                last_generation: 0,
            }),
        );

        let mut surface = RecordingSurface::default();
        let err = render_with(&config, &state, &mut surface).expect_err("must fail");
        assert_eq!(err.phase, DispatchPhase::Render);
        assert_eq!(err.key, EntityKey::from("glitch"));
    }

    #[test]
    fn fps_overlay_uses_default_text_style() {
        let config = EngineConfig {
            show_fps: true,
            ..EngineConfig::default()
        };
        let state = SimulationState::empty();
        let mut surface = RecordingSurface::default();
        render_with(&config, &state, &mut surface).expect("render");

        assert_eq!(
            surface.calls,
            vec![
                Call::Clear(600.0, 600.0),
                Call::Font("14px Verdana".to_string()),
                Call::Fill(DEFAULT_TEXT_COLOR),
                Call::Text("23.96".to_string(), 500.0, 50.0),
            ]
        );
    }

    #[test]
    fn text_helper_honours_overrides_and_ignores_bad_values() {
        let config = EngineConfig::default();
        let state = SimulationState::empty();
        let input = InputState::default();
        let mut surface = RecordingSurface::default();
        let mut ctx = RenderContext {
            config: &config,
            input: &input,
            fps: 0.0,
            state: &state,
            surface: &mut surface,
        };
        ctx.text(1.0, 2.0, "hi", Some("20px Mono"), Some("#000"));
        ctx.text(1.0, 2.0, "hi", Some("huge"), None);
        ctx.text(1.0, 2.0, "hi", None, Some("tomato"));

        assert_eq!(
            surface.calls,
            vec![
                Call::Font("20px Mono".to_string()),
                Call::Fill(Color::BLACK),
                Call::Text("hi".to_string(), 1.0, 2.0),
                Call::Font("14px Verdana".to_string()),
                Call::Fill(DEFAULT_TEXT_COLOR),
                Call::Text("hi".to_string(), 1.0, 2.0),
                Call::Font("14px Verdana".to_string()),
                Call::Fill(DEFAULT_TEXT_COLOR),
                Call::Text("hi".to_string(), 1.0, 2.0),
            ]
        );
    }
}

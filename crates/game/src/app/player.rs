use canvas_engine::{Color, EngineConfig, Entity, EntityFault, RenderContext, UpdateContext};

const PLAYER_SIZE_PX: f32 = 30.0;
const PLAYER_STEP_PX: f32 = 10.0;
const SPAWN_OFFSET_FROM_BOTTOM_PX: f32 = 100.0;

/// Square moved by the directional keys, kept inside the canvas.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Player {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    step: f32,
    color: Color,
}

impl Player {
    pub(crate) fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            width: PLAYER_SIZE_PX,
            height: PLAYER_SIZE_PX,
            step: PLAYER_STEP_PX,
            color: Color::BLACK,
        }
    }

    /// Horizontally centered, 100px above the bottom edge.
    pub(crate) fn spawn_for(config: &EngineConfig) -> Self {
        Self::at(
            config.width as f32 / 2.0,
            config.height as f32 - SPAWN_OFFSET_FROM_BOTTOM_PX,
        )
    }

    pub(crate) fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Entity for Player {
    fn update(&mut self, ctx: &UpdateContext<'_>) -> Result<(), EntityFault> {
        let input = ctx.input;
        if input.left {
            self.x -= self.step;
        }
        if input.right {
            self.x += self.step;
        }
        if input.up {
            self.y -= self.step;
        }
        if input.down {
            self.y += self.step;
        }

        let max_x = (ctx.config.width as f32 - self.width).max(0.0);
        let max_y = (ctx.config.height as f32 - self.height).max(0.0);
        self.x = self.x.clamp(0.0, max_x);
        self.y = self.y.clamp(0.0, max_y);
        Ok(())
    }

    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), EntityFault> {
        ctx.surface.set_fill_style(self.color);
        ctx.surface.fill_rect(self.x, self.y, self.width, self.height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use canvas_engine::{Direction, Engine, InputState, PixelCanvas, TickOutcome};

    use super::*;

    fn step(player: &mut Player, config: &EngineConfig, input: InputState, ticks: u32) {
        for generation in 1..=ticks {
            let ctx = UpdateContext {
                config,
                input: &input,
                fps: 24.0,
                now_ms: 0.0,
                generation: generation as u64,
            };
            player.update(&ctx).expect("player update");
        }
    }

    fn pixel(frame: &[u8], width: usize, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * width + x) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn spawns_centered_above_bottom_edge() {
        let player = Player::spawn_for(&EngineConfig::default());
        assert_eq!(player.position(), (300.0, 500.0));
    }

    #[test]
    fn held_keys_move_one_step_per_tick() {
        let config = EngineConfig::default();
        let mut player = Player::at(300.0, 300.0);
        let input = InputState::default()
            .with(Direction::Right, true)
            .with(Direction::Up, true);

        step(&mut player, &config, input, 3);
        assert_eq!(player.position(), (330.0, 270.0));
    }

    #[test]
    fn opposite_keys_cancel_out() {
        let config = EngineConfig::default();
        let mut player = Player::at(100.0, 100.0);
        let input = InputState {
            left: true,
            right: true,
            up: true,
            down: true,
        };

        step(&mut player, &config, input, 5);
        assert_eq!(player.position(), (100.0, 100.0));
    }

    #[test]
    fn clamps_to_bottom_edge() {
        let config = EngineConfig::default();
        let mut player = Player::at(300.0, 500.0);
        let input = InputState::default().with(Direction::Down, true);

        step(&mut player, &config, input, 20);
        assert_eq!(player.position(), (300.0, 570.0));
    }

    #[test]
    fn clamps_to_top_left_corner() {
        let config = EngineConfig::default();
        let mut player = Player::at(15.0, 25.0);
        let input = InputState::default()
            .with(Direction::Left, true)
            .with(Direction::Up, true);

        step(&mut player, &config, input, 4);
        assert_eq!(player.position(), (0.0, 0.0));
    }

    #[test]
    fn engine_drives_player_to_boundary_and_draws_it() {
        let config = EngineConfig::default();
        let width = config.width as usize;
        let height = config.height as usize;
        let mut frame = vec![0u8; width * height * 4];

        let mut engine = Engine::new(config, 0.0);
        engine.spawn("player", Box::new(Player::at(300.0, 500.0)));
        engine.set_input(InputState::default().with(Direction::Down, true));
        {
            let mut canvas = PixelCanvas::new(&mut frame, width as u32, height as u32, 1.0);
            engine.start(0.0, &mut canvas).expect("start");
        }

        let mut dispatched = 0;
        for n in 1..=20 {
            let mut canvas = PixelCanvas::new(&mut frame, width as u32, height as u32, 1.0);
            let outcome = engine.frame(n as f64 * 50.0, &mut canvas).expect("frame");
            if matches!(outcome, TickOutcome::Dispatched { .. }) {
                dispatched += 1;
            }
        }
        assert_eq!(dispatched, 20);

        assert_eq!(pixel(&frame, width, 310, 575), [0, 0, 0, 255]);
        assert_eq!(pixel(&frame, width, 310, 565), [255, 255, 255, 255]);
        assert_eq!(pixel(&frame, width, 310, 505), [255, 255, 255, 255]);
    }
}

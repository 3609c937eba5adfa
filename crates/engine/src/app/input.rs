#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Held state of the four directional keys, copied into each tick's context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl InputState {
    pub fn set(&mut self, direction: Direction, is_down: bool) {
        *self.slot_mut(direction) = is_down;
    }

    pub fn is_down(&self, direction: Direction) -> bool {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    pub fn with(mut self, direction: Direction, is_down: bool) -> Self {
        self.set(direction, is_down);
        self
    }

    fn slot_mut(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }
}

use crate::components::Handedness;

/// A single frame of button input, as sampled from whatever devices the application uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSample {
    pub left_grip: bool,
    pub right_grip: bool,
    pub drop: bool,
}

#[derive(Debug, Default)]
/// Context that holds input state. Allows systems to query for input edges without having to
/// worry about where the input came from.
pub struct InputContext {
    left_grip: bool,
    left_grip_prev: bool,
    right_grip: bool,
    right_grip_prev: bool,
    drop: bool,
    drop_prev: bool,
}

impl InputContext {
    /// Get the current state of the grip button on `handedness`
    pub fn grip(&self, handedness: Handedness) -> bool {
        match handedness {
            Handedness::Left => self.left_grip,
            Handedness::Right => self.right_grip,
        }
    }

    /// Was the grip button on `handedness` just pressed this frame?
    pub fn grip_just_pressed(&self, handedness: Handedness) -> bool {
        match handedness {
            Handedness::Left => !self.left_grip_prev & self.left_grip,
            Handedness::Right => !self.right_grip_prev & self.right_grip,
        }
    }

    /// Was the grip button on `handedness` just released this frame?
    pub fn grip_just_released(&self, handedness: Handedness) -> bool {
        match handedness {
            Handedness::Left => self.left_grip_prev & !self.left_grip,
            Handedness::Right => self.right_grip_prev & !self.right_grip,
        }
    }

    /// Get the current state of the drop key
    pub fn drop(&self) -> bool {
        self.drop
    }

    /// Was the drop key just pressed this frame?
    pub fn drop_just_pressed(&self) -> bool {
        !self.drop_prev & self.drop
    }

    /// Record this frame's input. Call once per frame, before `Session::tick`.
    pub fn update(&mut self, sample: InputSample) {
        self.left_grip_prev = self.left_grip;
        self.right_grip_prev = self.right_grip;
        self.drop_prev = self.drop;

        self.left_grip = sample.left_grip;
        self.right_grip = sample.right_grip;
        self.drop = sample.drop;
    }
}

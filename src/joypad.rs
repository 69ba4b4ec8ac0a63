/// A Game Boy button, independent of any particular host input backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

/// Represents the state of the Game Boy's buttons.
/// True = pressed, False = released (internal representation)
#[derive(Clone, Debug, Default)]
pub struct JoypadState {
    pub right: bool,
    pub left: bool,
    pub up: bool,
    pub down: bool,
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
}

impl JoypadState {
    fn get_mut(&mut self, button: Button) -> &mut bool {
        match button {
            Button::Right => &mut self.right,
            Button::Left => &mut self.left,
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::Select => &mut self.select,
            Button::Start => &mut self.start,
        }
    }

    fn is_direction(button: Button) -> bool {
        matches!(button, Button::Right | Button::Left | Button::Up | Button::Down)
    }
}

/// Manages Joypad state and interaction with the P1 register.
#[derive(Clone, Debug, Default)]
pub struct Joypad {
    state: JoypadState,
    // Store the P1 register's selectable bits (written by the game)
    p1_register_selection: u8, // Bits 4 and 5
}

impl Joypad {
    pub fn new() -> Self {
        Joypad {
            state: JoypadState::default(),
            // P1 defaults with bits 4 and 5 high (no selection).
            p1_register_selection: 0x30,
        }
    }

    /// Reads the P1 (Joypad) register based on current state and selection.
    pub fn read_p1(&self) -> u8 {
        let mut joypad_value = 0x0F; // Start with lower nibble high (released)

        if self.p1_register_selection & 0x20 == 0 {
            // Bit 5 Low: Select Action buttons (A, B, Select, Start)
            if self.state.a {
                joypad_value &= 0b1110;
            }
            if self.state.b {
                joypad_value &= 0b1101;
            }
            if self.state.select {
                joypad_value &= 0b1011;
            }
            if self.state.start {
                joypad_value &= 0b0111;
            }
        }
        if self.p1_register_selection & 0x10 == 0 {
            // Bit 4 Low: Select Direction buttons (Right, Left, Up, Down)
            if self.state.right {
                joypad_value &= 0b1110;
            }
            if self.state.left {
                joypad_value &= 0b1101;
            }
            if self.state.up {
                joypad_value &= 0b1011;
            }
            if self.state.down {
                joypad_value &= 0b0111;
            }
        }

        // Combine input bits (0-3) with selection bits (4-5) and unused high bits (reads 1)
        joypad_value | self.p1_register_selection | 0xC0
    }

    /// Writes to the P1 (Joypad) register (only bits 4, 5 are writable).
    pub fn write_p1(&mut self, value: u8) {
        self.p1_register_selection = value & 0x30;
    }

    /// Handles a button press. Returns true if a Joypad interrupt should be requested:
    /// the button must be newly pressed (released -> pressed) and its group (directions
    /// or actions) must currently be selected by the game.
    pub fn key_down(&mut self, button: Button) -> bool {
        let group_selected = if JoypadState::is_direction(button) {
            self.p1_register_selection & 0x10 == 0
        } else {
            self.p1_register_selection & 0x20 == 0
        };

        let slot = self.state.get_mut(button);
        let newly_pressed = !*slot;
        *slot = true;

        newly_pressed && group_selected
    }

    /// Handles a button release.
    pub fn key_up(&mut self, button: Button) {
        *self.state.get_mut(button) = false;
    }

    pub fn get_state(&self) -> &JoypadState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_buttons_read_as_high() {
        let joypad = Joypad::new();
        assert_eq!(joypad.read_p1() & 0x0F, 0x0F);
    }

    #[test]
    fn pressed_direction_clears_its_bit_when_selected() {
        let mut joypad = Joypad::new();
        joypad.write_p1(0x20); // select directions (bit 4 low), actions deselected
        joypad.key_down(Button::Up);
        assert_eq!(joypad.read_p1() & 0x04, 0);
    }

    #[test]
    fn interrupt_fires_only_when_group_selected_and_newly_pressed() {
        let mut joypad = Joypad::new();
        joypad.write_p1(0x20); // directions selected
        assert!(joypad.key_down(Button::Up));
        // Still held: no repeat interrupt.
        assert!(!joypad.key_down(Button::Up));

        joypad.key_up(Button::Up);
        joypad.write_p1(0x10); // now actions selected, directions deselected
        assert!(!joypad.key_down(Button::Down));
    }
}

//! Default GPIO assignments for the relay board (BCM numbering).
//!
//! The relays sit on the first outside header pins.  These are only the
//! defaults; every value can be overridden from the config file.

/// Pin identifier in BCM numbering.
pub type PinId = u8;

// ---------------------------------------------------------------------------
// Relay / indicator outputs
// ---------------------------------------------------------------------------

/// On/off outputs, lowest threshold first.
pub const DEFAULT_OUTPUT_PINS: [PinId; 3] = [15, 17, 18];

/// Default polarity: every output is active HIGH.
pub const DEFAULT_ON_STATES: [bool; 3] = [true, true, true];

// ---------------------------------------------------------------------------
// PWM output
// ---------------------------------------------------------------------------

/// Software-PWM output pin.
pub const DEFAULT_PWM_PIN: PinId = 14;

/// Software-PWM base frequency.
pub const DEFAULT_PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// Header limits
// ---------------------------------------------------------------------------

/// Highest BCM GPIO exposed on the 40-pin header.
pub const MAX_BCM_PIN: PinId = 27;

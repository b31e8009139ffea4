//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements  | Connects to                   |
//! |---------------|-------------|-------------------------------|
//! | `gpio`        | OutputPort  | Pi GPIO relays + software PWM |
//! | `bluetooth`   | RssiPort    | Linux HCI / L2CAP sockets     |
//! | `time`        | ClockPort   | Monotonic system clock        |
//! | `log_sink`    | EventSink   | `log` facade                  |

pub mod bluetooth;
pub mod gpio;
pub mod log_sink;
pub mod time;

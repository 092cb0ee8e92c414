//! Driving Environment
//!
//! Host weather and clock state mapped to driving modifiers:
//! - Weather speed multiplier and tyre friction coefficient
//! - Time-of-day speed multiplier and headlight control

pub mod time_of_day;
pub mod weather;

pub use time_of_day::{DayPeriod, TimeOfDayConfig, TimeOfDayMonitor, TimeOfDayUpdate};
pub use weather::{WeatherConfig, WeatherMonitor, WeatherProfile, WeatherState, BASE_FRICTION};

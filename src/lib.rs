pub mod constants;
pub mod coordinates;
pub mod deepsurvey_errors;
pub mod ephemeris;
pub mod observatory;
pub mod sky_brightness;
pub mod survey;
pub mod time;
pub mod weather;

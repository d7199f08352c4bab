use super::*;

mod copy_and_characters;
mod counters_sliders;
mod events_and_timers;

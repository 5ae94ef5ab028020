pub mod dispatcher;
pub mod lifecycle;
pub mod projection;
pub mod sequencer;

#![forbid(unsafe_code)]

pub mod capabilities;
pub mod confirmation;
pub mod recipient;
pub mod remote_trigger;
pub mod voice_session;

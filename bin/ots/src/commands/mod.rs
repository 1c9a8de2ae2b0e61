mod dump;
mod stamp;
mod upgrade;
mod verify;

pub(crate) use dump::*;
pub(crate) use stamp::*;
pub(crate) use upgrade::*;
pub(crate) use verify::*;

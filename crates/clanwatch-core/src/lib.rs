// Library root: the match tracking core plus the concrete collaborators
// (WebSocket source, replay prober, webhook dispatcher) it is wired to.

pub mod config;
pub mod detect;
pub mod dispatch;
pub mod model;
pub mod notify;
pub mod partition;
pub mod prober;
pub mod roster;
pub mod snapshot;
pub mod source;
pub mod verdict;
pub mod wire;

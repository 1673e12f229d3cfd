// Application layer: the polling loop that drives the match tracking core.

pub mod poller;

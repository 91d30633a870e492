mod account;
mod matches;
mod mmr;

pub use matches::MatchWindow;

pub mod replay;

#[derive(Debug)]
pub enum Action {
    Replay(replay::Args),
}

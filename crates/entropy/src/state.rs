//! The `Fresh -> Active -> Finalized` lifecycle shared by `Encoder` and
//! `Decoder`. Re-entry after `Finalized` is reported as
//! `CodecError::AlreadyFinalized`, not tolerated silently.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecState {
    Fresh,
    Active,
    Finalized,
}

impl CodecState {
    pub fn is_finalized(self) -> bool {
        matches!(self, CodecState::Finalized)
    }
}

mod block;
mod card;
mod info;
pub mod init;
mod registers;

pub use card::{Card, CardState, Speed};
pub use init::{BringUp, BringUpState};

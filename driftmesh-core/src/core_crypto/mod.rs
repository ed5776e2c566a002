pub mod hash;
pub mod keypair;

pub use hash::EntryHash;
pub use keypair::Keypair;

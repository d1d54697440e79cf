// Protocol core shared by the client and the relay server: crypto envelope,
// wire codec, and gram fragmentation.

pub mod constants;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod gram;
pub mod identity;
pub mod wire;

pub use envelope::Message;
pub use error::{CodecError, CryptoError, FragmentError, IdentityError};
pub use gram::{Gram, Reassembler};
pub use identity::{AuthToken, Identity};

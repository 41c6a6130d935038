/// Modular arithmetic primitives.
pub mod field;
/// Group parameters and presets.
pub mod group;
/// Wire encoding of big integers.
pub mod operand;
/// Primitive operations behind the `CryptoProvider` trait.
pub mod provider;

pub use group::GroupParameters;
pub use operand::Operand;
pub use provider::{Challenge, CryptoProvider, ModPowProvider};

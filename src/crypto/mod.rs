pub mod signature_utils;
pub mod signing;

pub use self::signing::{
    address_from_private_key, hash_message, keccak256, recover_address, sign_message,
    EthereumMessageVerifier, RecoverableSignature, SignatureVerifier,
};

//! Cryptographic primitive wrappers (spec §3.1): secp256k1 keys/signatures
//! and SHA-256 hashes, plus the block/transaction id derivation rules from
//! spec §6 (a height prefix overwrites the high bits of a block id so the
//! height is recoverable from the id alone).

use std::fmt;

use codec::{Decode, Encode};
use secp256k1::{ecdsa::Signature as EcdsaSignature, Message, PublicKey as Secp256k1PublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ChainError, ChainResult};

/// A 256-bit SHA-256 digest.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
	pub fn hash(data: &[u8]) -> Self {
		let digest = Sha256::digest(data);
		let mut bytes = [0u8; 32];
		bytes.copy_from_slice(&digest);
		Sha256Hash(bytes)
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}
}

impl fmt::Display for Sha256Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

/// A 160-bit identifier shared by blocks and transactions. The high 32 bits
/// are the big-endian block height for a block id (spec §6); for a
/// transaction id they are simply the leading bits of the hash.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct ObjectId160(pub [u8; 20]);

impl ObjectId160 {
	pub fn zero() -> Self {
		ObjectId160([0u8; 20])
	}

	pub fn from_sha256_truncated(hash: &Sha256Hash) -> Self {
		let mut bytes = [0u8; 20];
		bytes.copy_from_slice(&hash.0[..20]);
		ObjectId160(bytes)
	}

	/// Derives a block id: truncate the header hash to 160 bits, then
	/// overwrite the top 4 bytes with the big-endian block number so the
	/// height can be recovered from the id (spec §3.1, §6).
	pub fn block_id(header_hash: &Sha256Hash, block_number: u32) -> Self {
		let mut id = Self::from_sha256_truncated(header_hash);
		id.0[0..4].copy_from_slice(&block_number.to_be_bytes());
		id
	}

	pub fn block_number(&self) -> u32 {
		u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
	}

	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}
}

impl fmt::Display for ObjectId160 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

/// A secp256k1 public key, used as an account's owner/active/posting/secure
/// role key (spec §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub Secp256k1PublicKey);

impl PartialOrd for PublicKey {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for PublicKey {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.to_bytes().cmp(&other.to_bytes())
	}
}

impl PublicKey {
	pub fn to_bytes(&self) -> [u8; 33] {
		self.0.serialize()
	}

	pub fn from_bytes(bytes: &[u8]) -> ChainResult<Self> {
		Secp256k1PublicKey::from_slice(bytes)
			.map(PublicKey)
			.map_err(|e| ChainError::InvalidEncoding(format!("bad public key: {e}")))
	}
}

impl Encode for PublicKey {
	fn encode(&self) -> Vec<u8> {
		self.to_bytes().to_vec()
	}
}

impl Decode for PublicKey {
	fn decode<I: codec::Input>(input: &mut I) -> Result<Self, codec::Error> {
		let mut bytes = [0u8; 33];
		input.read(&mut bytes)?;
		PublicKey::from_bytes(&bytes).map_err(|_| codec::Error::from("invalid public key"))
	}
}

impl Serialize for PublicKey {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&hex::encode(self.to_bytes()))
	}
}

impl<'de> Deserialize<'de> for PublicKey {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
		PublicKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
	}
}

/// An ECDSA signature over a secp256k1 curve point, with the recovery id
/// dropped: signature verification here is always against an explicit
/// candidate public key (the authority checker enumerates an account's
/// authorized keys rather than recovering a key from the signature).
#[derive(Debug, Clone, Copy)]
pub struct Signature(pub EcdsaSignature);

impl Signature {
	pub fn verify(&self, message_hash: &Sha256Hash, public_key: &PublicKey) -> bool {
		let Ok(message) = Message::from_digest_slice(&message_hash.0) else { return false };
		let secp = secp256k1::Secp256k1::verification_only();
		secp.verify_ecdsa(&message, &self.0, &public_key.0).is_ok()
	}

	pub fn to_bytes(&self) -> Vec<u8> {
		self.0.serialize_compact().to_vec()
	}

	pub fn from_bytes(bytes: &[u8]) -> ChainResult<Self> {
		EcdsaSignature::from_compact(bytes)
			.map(Signature)
			.map_err(|e| ChainError::InvalidEncoding(format!("bad signature: {e}")))
	}
}

impl Encode for Signature {
	fn encode(&self) -> Vec<u8> {
		self.to_bytes()
	}
}

impl Decode for Signature {
	fn decode<I: codec::Input>(input: &mut I) -> Result<Self, codec::Error> {
		let mut bytes = [0u8; 64];
		input.read(&mut bytes)?;
		Signature::from_bytes(&bytes).map_err(|_| codec::Error::from("invalid signature"))
	}
}

impl Serialize for Signature {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&hex::encode(self.to_bytes()))
	}
}

impl<'de> Deserialize<'de> for Signature {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
		Signature::from_bytes(&bytes).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use secp256k1::{rand::rngs::OsRng, Secp256k1, SecretKey};

	#[test]
	fn sign_and_verify_round_trip() {
		let secp = Secp256k1::new();
		let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
		let hash = Sha256Hash::hash(b"hello chain");
		let message = Message::from_digest_slice(&hash.0).unwrap();
		let sig = secp.sign_ecdsa(&message, &secret_key);
		let wrapped_sig = Signature(sig);
		let wrapped_pub = PublicKey(public_key);
		assert!(wrapped_sig.verify(&hash, &wrapped_pub));

		let other_secret = SecretKey::new(&mut OsRng);
		let other_public = Secp256k1PublicKey::from_secret_key(&secp, &other_secret);
		assert!(!wrapped_sig.verify(&hash, &PublicKey(other_public)));
	}

	#[test]
	fn block_id_embeds_height_in_high_bits() {
		let header_hash = Sha256Hash::hash(b"block header bytes");
		let id = ObjectId160::block_id(&header_hash, 123_456);
		assert_eq!(id.block_number(), 123_456);
	}
}

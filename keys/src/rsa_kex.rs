//! RSA key exchange (spec.md §4.3): the server transmits a transient RSA
//! public key; the client draws a shared secret and encrypts it under that
//! key with OAEP, using the same hash as the exchange-hash algorithm.
use pssh_mpint::{EntropySource, MPInt};
use rsa::{Oaep, PublicKey as RsaPublicKeyTrait, RsaPublicKey as RsaCryptoPublicKey};
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::rsa::RsaPublicKey;

/// Generate a random shared secret `k` as wide as the transient RSA
/// modulus minus two bytes (OAEP's own message-size headroom), then
/// OAEP-encrypt it under the server's transient key.
pub fn client_encrypt_secret(
	transient_key:&RsaPublicKey,
	rng:&mut dyn EntropySource,
) -> Result<(MPInt, Vec<u8>)> {
	let modulus_bytes = (transient_key.n.max_bits() + 7) / 8;
	let secret_bytes_len = modulus_bytes.saturating_sub(2 * 32 + 2).max(1);

	let mut secret_bytes = vec![0u8; secret_bytes_len];
	rng.fill_bytes(&mut secret_bytes);
	let secret = MPInt::from_bytes_be(&secret_bytes, secret_bytes_len * 8);

	let public = to_rsa_crypto_key(transient_key)?;

	let mut entropy = RngAdapter(rng);
	let ciphertext = public
		.encrypt(&mut entropy, Oaep::new::<Sha256>(), &secret_bytes)
		.map_err(|_| Error::CouldNotReadKey)?;

	Ok((secret, ciphertext))
}

fn to_rsa_crypto_key(key:&RsaPublicKey) -> Result<RsaCryptoPublicKey> {
	let n = rsa::BigUint::from_bytes_be(&key.n.to_bytes_be());
	let e = rsa::BigUint::from_bytes_be(&key.e.to_bytes_be());
	RsaCryptoPublicKey::new(n, e).map_err(|_| Error::CouldNotReadKey)
}

/// Bridges our [`EntropySource`] to the `rand_core` traits the `rsa`
/// crate's OAEP padding expects, without pulling a second `rand_core`
/// major version into `pssh-mpint` itself.
struct RngAdapter<'a>(&'a mut dyn EntropySource);

impl<'a> rand_core_06::RngCore for RngAdapter<'a> {
	fn next_u32(&mut self) -> u32 {
		let mut b = [0u8; 4];
		self.0.fill_bytes(&mut b);
		u32::from_le_bytes(b)
	}

	fn next_u64(&mut self) -> u64 {
		let mut b = [0u8; 8];
		self.0.fill_bytes(&mut b);
		u64::from_le_bytes(b)
	}

	fn fill_bytes(&mut self, dest:&mut [u8]) { self.0.fill_bytes(dest) }

	fn try_fill_bytes(&mut self, dest:&mut [u8]) -> std::result::Result<(), rand_core_06::Error> {
		self.0.fill_bytes(dest);
		Ok(())
	}
}

impl<'a> rand_core_06::CryptoRng for RngAdapter<'a> {}

#[cfg(test)]
mod tests {
	use pssh_mpint::TestRng;
	use pssh_primegen::NullProgress;

	use super::*;
	use crate::rsa::RsaKeyPair;

	#[test]
	fn client_secret_decrypts_back_under_the_server_private_key() {
		let mut rng = TestRng::new(21);
		let server = RsaKeyPair::generate(1024, &mut rng, &mut NullProgress).unwrap();

		let mut client_rng = TestRng::new(22);
		let (secret, ciphertext) = client_encrypt_secret(&server.public_key(), &mut client_rng).unwrap();

		let n = rsa::BigUint::from_bytes_be(&server.public.n.to_bytes_be());
		let e = rsa::BigUint::from_bytes_be(&server.public.e.to_bytes_be());
		let d = rsa::BigUint::from_bytes_be(&server.d.to_bytes_be());
		let private = rsa::RsaPrivateKey::from_components(n, e, d, vec![
			rsa::BigUint::from_bytes_be(&server.p.to_bytes_be()),
			rsa::BigUint::from_bytes_be(&server.q.to_bytes_be()),
		]);
		let recovered = private.decrypt(Oaep::new::<Sha256>(), &ciphertext).unwrap();
		assert_eq!(recovered, secret.to_bytes_be());
	}
}

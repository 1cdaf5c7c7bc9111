use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("malformed key blob")]
	CouldNotReadKey,
	#[error("unsupported key type {0:?}")]
	UnsupportedKeyType(String),
	#[error("signature verification failed")]
	VerificationFailed,
	#[error("key file is encrypted and no passphrase was supplied, or the passphrase is wrong")]
	KeyIsEncrypted,
	#[error("key file's MAC did not verify: wrong passphrase")]
	WrongPassphrase,
	#[error("key file's MAC did not verify: data is corrupted")]
	KeyFileCorrupted,
	#[error("base64 decode error")]
	Base64Decode,
	#[error("PEM/PPK/OpenSSH header missing required field {0:?}")]
	MissingHeaderField(&'static str),
	#[error("index out of bounds while decoding")]
	IndexOutOfBounds,
	#[error("certificate validation failed: {0}")]
	CertInvalid(String),
	#[error(transparent)]
	MPInt(#[from] pssh_mpint::Error),
	#[error(transparent)]
	Primegen(#[from] pssh_primegen::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

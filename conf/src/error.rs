use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("unknown configuration key {0:?}")]
	UnknownKey(String),
	#[error("configuration key {0:?} has value type {1}, not {2}")]
	WrongType(String, &'static str, &'static str),
	#[error("configuration key {0:?} requires a subkey")]
	MissingSubkey(String),
	#[error("malformed saved-session line: {0:?}")]
	MalformedLine(String),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("value does not fit in the declared bit width")]
	WidthOverflow,
	#[error("division by a zero modulus or divisor")]
	DivisionByZero,
	#[error("value is not invertible modulo the given modulus")]
	NotInvertible,
	#[error("Montgomery context requires an odd modulus")]
	EvenModulus,
	#[error("invalid hexadecimal integer literal")]
	InvalidHex,
	#[error("caller supplied contradictory residue constraints")]
	ContradictoryConstraint,
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("contradictory residue constraints passed to PrimeCandidateSource")]
	ContradictoryConstraint,
	#[error("PrimeCandidateSource::generate called before ready()")]
	NotReady,
	#[error("candidate generation exceeded its rejection-sampling budget")]
	GaveUp,
	#[error(transparent)]
	MPInt(#[from] pssh_mpint::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

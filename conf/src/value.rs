//! The typed value domain a `CONF_OPTION` can hold (spec.md §4.7,
//! `examples/original_source/conf.h`'s `VALUE_TYPE`). `FONT` is dropped:
//! it names a GUI font-selection widget value, out of scope per spec.md
//! §1's "GUI controls" non-goal.
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	Int(i64),
	Bool(bool),
	Str(String),
	/// Like `Str`, but round-tripped through UTF-8-safe percent escaping
	/// on save (spec.md distinguishes `STR` from `UTF8` because the
	/// legacy on-disk format is not itself UTF-8-clean).
	Utf8(String),
	FileName(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
	Int,
	Bool,
	Str,
	Utf8,
	FileName,
}

impl Value {
	pub fn kind(&self) -> ValueKind {
		match self {
			Value::Int(_) => ValueKind::Int,
			Value::Bool(_) => ValueKind::Bool,
			Value::Str(_) => ValueKind::Str,
			Value::Utf8(_) => ValueKind::Utf8,
			Value::FileName(_) => ValueKind::FileName,
		}
	}

	pub fn as_int(&self) -> Result<i64> {
		match self {
			Value::Int(v) => Ok(*v),
			other => Err(Error::WrongType(String::new(), other.kind().name(), ValueKind::Int.name())),
		}
	}

	pub fn as_bool(&self) -> Result<bool> {
		match self {
			Value::Bool(v) => Ok(*v),
			other => Err(Error::WrongType(String::new(), other.kind().name(), ValueKind::Bool.name())),
		}
	}

	pub fn as_str(&self) -> Result<&str> {
		match self {
			Value::Str(v) | Value::Utf8(v) => Ok(v),
			other => Err(Error::WrongType(String::new(), other.kind().name(), ValueKind::Str.name())),
		}
	}

	pub fn as_path(&self) -> Result<&std::path::Path> {
		match self {
			Value::FileName(v) => Ok(v),
			other => Err(Error::WrongType(String::new(), other.kind().name(), ValueKind::FileName.name())),
		}
	}

	/// Render for the on-disk/save-string representation: decimal for
	/// `Int`, `"1"`/`"0"` for `Bool`, raw text otherwise.
	pub fn to_save_string(&self) -> String {
		match self {
			Value::Int(v) => v.to_string(),
			Value::Bool(v) => if *v { "1" } else { "0" }.to_string(),
			Value::Str(v) | Value::Utf8(v) => v.clone(),
			Value::FileName(v) => v.to_string_lossy().into_owned(),
		}
	}

	pub fn parse_as(kind:ValueKind, text:&str) -> Result<Value> {
		Ok(match kind {
			ValueKind::Int => Value::Int(text.parse().map_err(|_| Error::MalformedLine(text.to_string()))?),
			ValueKind::Bool => Value::Bool(text != "0"),
			ValueKind::Str => Value::Str(text.to_string()),
			ValueKind::Utf8 => Value::Utf8(text.to_string()),
			ValueKind::FileName => Value::FileName(PathBuf::from(text)),
		})
	}
}

impl ValueKind {
	pub fn name(self) -> &'static str {
		match self {
			ValueKind::Int => "INT",
			ValueKind::Bool => "BOOL",
			ValueKind::Str => "STR",
			ValueKind::Utf8 => "UTF8",
			ValueKind::FileName => "FILENAME",
		}
	}
}

pub type SdResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Entity (place, task, equipment item, image) not found by id
	NotFound,
	/// Delete-class operation attempted without privilege
	PermissionDenied,
	/// Shared mode is not configured
	Disabled,
	DbError,
	Parse,
	Internal(Box<str>),

	// externals
	Io(std::io::Error),
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(_err: serde_json::Error) -> Self {
		Self::Parse
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{:?}", self)
	}
}

impl std::error::Error for Error {}

// vim: ts=4

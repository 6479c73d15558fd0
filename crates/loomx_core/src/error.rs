use crate::{device::Device, dtype::DType};
use std::fmt;

/// Message payload for [`Error::KeyNotFound`].
///
/// Key errors quote their argument on display, which turns embedded
/// newlines into `\n` and makes multi-line text unreadable. A verbatim
/// message opts out of the quoting while keeping the error kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMessage {
    text: String,
    verbatim: bool,
}

impl KeyMessage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            text: key.into(),
            verbatim: false,
        }
    }

    pub fn verbatim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            verbatim: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for KeyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verbatim {
            f.write_str(&self.text)
        } else {
            write!(f, "{:?}", self.text)
        }
    }
}

#[derive(Debug)]
pub enum Error {
    OutOfMemory,
    DTypeMismatch {
        expected: DType,
        got: DType,
    },
    DeviceMismatch {
        expected: Device,
        got: Device,
    },
    UnsupportedDType,
    InvalidArgument(String),
    InvalidDevice(String),
    IncompatibleShape(String),
    KeyNotFound(KeyMessage),
    //
    BufferShared,
    GradLocked,
    InvalidShape {
        message: String,
    },
    IndexOutOfBounds {
        index: usize,
        size: usize,
    },
    ConversionError(String),
    // rebuild
    UnsupportedScheme(String),
    InvalidStructure {
        message: String,
    },
    InvalidState {
        message: String,
    },
    // serde
    #[cfg(feature = "serde")]
    SerializationError(String),
    #[cfg(feature = "serde")]
    DeserializationError(String),
    //
    Internal {
        message: String,
    },
    External {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "Out of memory"),
            Self::DTypeMismatch { expected, got } => {
                write!(f, "DType mismatch: expected {:?}, got {:?}", expected, got)
            }
            Self::DeviceMismatch { expected, got } => {
                write!(f, "Device mismatch: expected {}, got {}", expected.name(), got.name())
            }
            Self::UnsupportedDType => write!(f, "Unsupported data type"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Self::InvalidDevice(msg) => write!(f, "Invalid device: {}", msg),
            Self::IncompatibleShape(msg) => write!(f, "Incompatible shape: {}", msg),
            Self::KeyNotFound(key) => write!(f, "Key not found: {}", key),

            Self::BufferShared => write!(f, "Buffer is shared"),
            Self::GradLocked => write!(f, "Grad is locked"),
            Self::InvalidShape { message } => {
                write!(f, "Invalid shape: {}", message)
            }
            Self::IndexOutOfBounds { index, size } => {
                write!(f, "Index out of bounds: index {} is out of bounds for tensor with size {}", index, size)
            }
            Self::ConversionError(msg) => {
                write!(f, "Type conversion error: {}", msg)
            }
            Self::UnsupportedScheme(msg) => {
                write!(f, "Unsupported scheme: {}", msg)
            }
            Self::InvalidStructure { message } => {
                write!(f, "Invalid structure: {}", message)
            }
            Self::InvalidState { message } => {
                write!(f, "Invalid state: {}", message)
            }
            #[cfg(feature = "serde")]
            Self::SerializationError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            #[cfg(feature = "serde")]
            Self::DeserializationError(msg) => {
                write!(f, "Deserialization error: {}", msg)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
            Self::External { message } => {
                write!(f, "External error: {}", message)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Fieldless tag mirroring the [`Error`] variants, used where an error's
/// identity has to survive without its payload (see [`crate::capture`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfMemory,
    DTypeMismatch,
    DeviceMismatch,
    UnsupportedDType,
    InvalidArgument,
    InvalidDevice,
    IncompatibleShape,
    KeyNotFound,
    BufferShared,
    GradLocked,
    InvalidShape,
    IndexOutOfBounds,
    ConversionError,
    UnsupportedScheme,
    InvalidStructure,
    InvalidState,
    #[cfg(feature = "serde")]
    SerializationError,
    #[cfg(feature = "serde")]
    DeserializationError,
    Internal,
    External,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfMemory => ErrorKind::OutOfMemory,
            Self::DTypeMismatch { .. } => ErrorKind::DTypeMismatch,
            Self::DeviceMismatch { .. } => ErrorKind::DeviceMismatch,
            Self::UnsupportedDType => ErrorKind::UnsupportedDType,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidDevice(_) => ErrorKind::InvalidDevice,
            Self::IncompatibleShape(_) => ErrorKind::IncompatibleShape,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::BufferShared => ErrorKind::BufferShared,
            Self::GradLocked => ErrorKind::GradLocked,
            Self::InvalidShape { .. } => ErrorKind::InvalidShape,
            Self::IndexOutOfBounds { .. } => ErrorKind::IndexOutOfBounds,
            Self::ConversionError(_) => ErrorKind::ConversionError,
            Self::UnsupportedScheme(_) => ErrorKind::UnsupportedScheme,
            Self::InvalidStructure { .. } => ErrorKind::InvalidStructure,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            #[cfg(feature = "serde")]
            Self::SerializationError(_) => ErrorKind::SerializationError,
            #[cfg(feature = "serde")]
            Self::DeserializationError(_) => ErrorKind::DeserializationError,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::External { .. } => ErrorKind::External,
        }
    }
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OutOfMemory",
            Self::DTypeMismatch => "DTypeMismatch",
            Self::DeviceMismatch => "DeviceMismatch",
            Self::UnsupportedDType => "UnsupportedDType",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidDevice => "InvalidDevice",
            Self::IncompatibleShape => "IncompatibleShape",
            Self::KeyNotFound => "KeyNotFound",
            Self::BufferShared => "BufferShared",
            Self::GradLocked => "GradLocked",
            Self::InvalidShape => "InvalidShape",
            Self::IndexOutOfBounds => "IndexOutOfBounds",
            Self::ConversionError => "ConversionError",
            Self::UnsupportedScheme => "UnsupportedScheme",
            Self::InvalidStructure => "InvalidStructure",
            Self::InvalidState => "InvalidState",
            #[cfg(feature = "serde")]
            Self::SerializationError => "SerializationError",
            #[cfg(feature = "serde")]
            Self::DeserializationError => "DeserializationError",
            Self::Internal => "Internal",
            Self::External => "External",
        }
    }

    /// Rebuilds an error of this kind from a single message.
    ///
    /// Kinds with a named `message` field or one string payload succeed;
    /// kinds carrying structured fields (or none at all) hand the message
    /// back untouched so the caller can decide what to raise instead.
    pub fn with_message(self, msg: String) -> std::result::Result<Error, String> {
        match self {
            Self::InvalidShape => Ok(Error::InvalidShape { message: msg }),
            Self::InvalidStructure => Ok(Error::InvalidStructure { message: msg }),
            Self::InvalidState => Ok(Error::InvalidState { message: msg }),
            Self::Internal => Ok(Error::Internal { message: msg }),
            Self::External => Ok(Error::External { message: msg }),
            Self::InvalidArgument => Ok(Error::InvalidArgument(msg)),
            Self::InvalidDevice => Ok(Error::InvalidDevice(msg)),
            Self::IncompatibleShape => Ok(Error::IncompatibleShape(msg)),
            Self::ConversionError => Ok(Error::ConversionError(msg)),
            Self::UnsupportedScheme => Ok(Error::UnsupportedScheme(msg)),
            Self::KeyNotFound => Ok(Error::KeyNotFound(KeyMessage::new(msg))),
            #[cfg(feature = "serde")]
            Self::SerializationError => Ok(Error::SerializationError(msg)),
            #[cfg(feature = "serde")]
            Self::DeserializationError => Ok(Error::DeserializationError(msg)),
            Self::OutOfMemory
            | Self::DTypeMismatch
            | Self::DeviceMismatch
            | Self::UnsupportedDType
            | Self::BufferShared
            | Self::GradLocked
            | Self::IndexOutOfBounds => Err(msg),
        }
    }
}

//! Per-service encode/decode plus the three peer-visible error
//! taxonomies that travel on the wire back to a requester.

mod device_control;
mod discovery;
mod read_write;
mod supplementary;

pub use device_control::{
    decode_device_communication_control_request, decode_reinitialize_device_request,
    encode_device_communication_control_request, encode_reinitialize_device_request,
    DeviceCommunicationControlRequest, EnableDisable, ReinitializeDeviceRequest, ReinitializedState,
};
pub use discovery::{
    decode_i_am_request, decode_i_have_request, decode_who_has_request, decode_who_is_request,
    encode_i_am_request, encode_i_have_request, encode_who_has_request, encode_who_is_request,
    IAmRequest, IHaveRequest, WhoHasRequest, WhoIsRequest,
};
pub use read_write::{
    decode_read_access_result, decode_read_property_ack, decode_read_property_multiple_ack,
    decode_read_property_multiple_request, decode_read_property_request, decode_write_property_request,
    encode_read_access_result, encode_read_property_ack, encode_read_property_multiple_ack,
    encode_read_property_multiple_request, encode_read_property_request, encode_write_property_request,
    PropertyAccessResult, PropertyReadOutcome, PropertyReference, ReadAccessResult, ReadAccessSpecification,
    ReadPropertyAck, ReadPropertyRequest, WritePropertyRequest,
};
pub use supplementary::{
    decode_atomic_read_file_ack, decode_atomic_read_file_request, decode_life_safety_operation_request,
    decode_read_range_ack, decode_read_range_request, encode_atomic_read_file_ack,
    encode_atomic_read_file_request, encode_life_safety_operation_request, encode_read_range_ack,
    encode_read_range_request, AtomicReadFileAck, AtomicReadFileRequest, ByPositionRange,
    LifeSafetyOperationRequest, ReadRangeAck, ReadRangeRequest, ReadRangeResultFlags,
};

use crate::errors::ProtocolError;

/// Confirmed service choice codes (ASHRAE 135 Table 21-1, the subset this
/// crate implements; others decode to `Unrecognized`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfirmedServiceChoice {
    /// `AtomicReadFile`.
    AtomicReadFile,
    /// `ReadProperty`.
    ReadProperty,
    /// `ReadPropertyMultiple`.
    ReadPropertyMultiple,
    /// `WriteProperty`.
    WriteProperty,
    /// `DeviceCommunicationControl`.
    DeviceCommunicationControl,
    /// `ReinitializeDevice`.
    ReinitializeDevice,
    /// `ReadRange`.
    ReadRange,
    /// `LifeSafetyOperation`.
    LifeSafetyOperation,
    /// Anything else, kept as its raw wire value.
    Unrecognized(u8),
}

impl ConfirmedServiceChoice {
    /// Maps a wire service-choice octet to a known variant.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            6 => Self::AtomicReadFile,
            12 => Self::ReadProperty,
            14 => Self::ReadPropertyMultiple,
            15 => Self::WriteProperty,
            17 => Self::DeviceCommunicationControl,
            20 => Self::ReinitializeDevice,
            26 => Self::ReadRange,
            27 => Self::LifeSafetyOperation,
            other => Self::Unrecognized(other),
        }
    }

    /// Maps a variant back to its wire service-choice octet.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::AtomicReadFile => 6,
            Self::ReadProperty => 12,
            Self::ReadPropertyMultiple => 14,
            Self::WriteProperty => 15,
            Self::DeviceCommunicationControl => 17,
            Self::ReinitializeDevice => 20,
            Self::ReadRange => 26,
            Self::LifeSafetyOperation => 27,
            Self::Unrecognized(v) => v,
        }
    }
}

/// Unconfirmed service choice codes (ASHRAE 135 Table 21-2, the subset this
/// crate implements; others decode to `Unrecognized`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnconfirmedServiceChoice {
    /// `I-Am`.
    IAm,
    /// `I-Have`.
    IHave,
    /// `Who-Has`.
    WhoHas,
    /// `Who-Is`.
    WhoIs,
    /// Anything else, kept as its raw wire value.
    Unrecognized(u8),
}

impl UnconfirmedServiceChoice {
    /// Maps a wire service-choice octet to a known variant.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::IAm,
            1 => Self::IHave,
            7 => Self::WhoHas,
            8 => Self::WhoIs,
            other => Self::Unrecognized(other),
        }
    }

    /// Maps a variant back to its wire service-choice octet.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::IAm => 0,
            Self::IHave => 1,
            Self::WhoHas => 7,
            Self::WhoIs => 8,
            Self::Unrecognized(v) => v,
        }
    }
}

/// Reject reasons (ASHRAE 135 Table 21-3): the peer could not decode our
/// request. Terminal; never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum RejectReason {
    /// Unclassified decode failure.
    Other,
    /// Request too large to buffer.
    BufferOverflow,
    /// Parameter values conflict with each other.
    InconsistentParameters,
    /// A parameter's application tag did not match its expected type.
    InvalidParameterDataType,
    /// A tag header itself was malformed.
    InvalidTag,
    /// A required parameter was absent.
    MissingRequiredParameter,
    /// A parameter value was outside its legal range.
    ParameterOutOfRange,
    /// More parameters were supplied than the service accepts.
    TooManyArguments,
    /// An enumerated value had no defined meaning.
    UndefinedEnumeration,
    /// The service choice has no registered handler.
    UnrecognizedService,
}

impl RejectReason {
    /// Maps to the ASHRAE 135 wire value.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Other => 0,
            Self::BufferOverflow => 1,
            Self::InconsistentParameters => 2,
            Self::InvalidParameterDataType => 3,
            Self::InvalidTag => 4,
            Self::MissingRequiredParameter => 5,
            Self::ParameterOutOfRange => 6,
            Self::TooManyArguments => 7,
            Self::UndefinedEnumeration => 8,
            Self::UnrecognizedService => 9,
        }
    }

    /// Maps a wire value back to a reason, falling back to `Other`.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::BufferOverflow,
            2 => Self::InconsistentParameters,
            3 => Self::InvalidParameterDataType,
            4 => Self::InvalidTag,
            5 => Self::MissingRequiredParameter,
            6 => Self::ParameterOutOfRange,
            7 => Self::TooManyArguments,
            8 => Self::UndefinedEnumeration,
            9 => Self::UnrecognizedService,
            _ => Self::Other,
        }
    }
}

/// Abort reasons (ASHRAE 135 Table 21-4): the peer understood our request
/// but could not process it. Terminal; never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AbortReason {
    /// Unclassified failure.
    Other,
    /// The receiver ran out of buffer space.
    BufferOverflow,
    /// The PDU does not belong in the transaction's current state.
    InvalidApduInThisState,
    /// A higher-priority task preempted processing.
    PreemptedByHigherPriorityTask,
    /// The receiver does not support segmentation.
    SegmentationNotSupported,
    /// A security check failed.
    SecurityError,
    /// The peer's security posture was insufficient.
    InsufficientSecurity,
    /// The proposed window size is unacceptable.
    WindowSizeOutOfRange,
    /// The application exceeded its reply-time budget.
    ApplicationExceededReplyTime,
    /// No transaction slot or buffer was available.
    OutOfResources,
    /// The transaction state machine timed out.
    TsmTimeout,
    /// The assembled APDU exceeds the maximum this node accepts.
    ApduTooLong,
}

impl AbortReason {
    /// Maps to the ASHRAE 135 wire value.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Other => 0,
            Self::BufferOverflow => 1,
            Self::InvalidApduInThisState => 2,
            Self::PreemptedByHigherPriorityTask => 3,
            Self::SegmentationNotSupported => 4,
            Self::SecurityError => 5,
            Self::InsufficientSecurity => 6,
            Self::WindowSizeOutOfRange => 7,
            Self::ApplicationExceededReplyTime => 8,
            Self::OutOfResources => 9,
            Self::TsmTimeout => 10,
            Self::ApduTooLong => 11,
        }
    }

    /// Maps a wire value back to a reason, falling back to `Other`.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::BufferOverflow,
            2 => Self::InvalidApduInThisState,
            3 => Self::PreemptedByHigherPriorityTask,
            4 => Self::SegmentationNotSupported,
            5 => Self::SecurityError,
            6 => Self::InsufficientSecurity,
            7 => Self::WindowSizeOutOfRange,
            8 => Self::ApplicationExceededReplyTime,
            9 => Self::OutOfResources,
            10 => Self::TsmTimeout,
            11 => Self::ApduTooLong,
            _ => Self::Other,
        }
    }
}

/// Error class (ASHRAE 135 Table 18-1, first half of the `(class, code)` pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorClass {
    /// Device-level failure.
    Device,
    /// Object-level failure.
    Object,
    /// Property-level failure.
    Property,
    /// The node lacked a resource needed to complete the request.
    Resources,
    /// Security/authentication failure.
    Security,
    /// Service-level failure.
    Services,
    /// Virtual-terminal failure.
    Vt,
    /// Datalink/communication failure.
    Communication,
}

impl ErrorClass {
    /// Maps to the ASHRAE 135 wire value.
    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::Device => 0,
            Self::Object => 1,
            Self::Property => 2,
            Self::Resources => 3,
            Self::Security => 4,
            Self::Services => 5,
            Self::Vt => 6,
            Self::Communication => 7,
        }
    }

    /// Maps a wire value back to a class.
    pub fn from_u32(value: u32) -> crate::errors::Result<Self> {
        Ok(match value {
            0 => Self::Device,
            1 => Self::Object,
            2 => Self::Property,
            3 => Self::Resources,
            4 => Self::Security,
            5 => Self::Services,
            6 => Self::Vt,
            7 => Self::Communication,
            other => {
                return Err(ProtocolError::ValueOutOfRange {
                    field: "error_class",
                    value: i64::from(other),
                })
            },
        })
    }
}

/// Error code (ASHRAE 135 Table 18-1, second half of the `(class, code)`
/// pair). This is the subset this crate's services actually raise; any
/// other wire value round-trips through `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Unclassified failure.
    Other(u32),
    /// A configuration operation is already in progress.
    ConfigurationInProgress,
    /// The addressed device is too busy to service the request.
    DeviceBusy,
    /// The addressed file could not be opened for the requested access.
    FileAccessDenied,
    /// Parameter values conflict with each other.
    InconsistentParameters,
    /// An array index was out of bounds.
    InvalidArrayIndex,
    /// A parameter's data type did not match what the property expects.
    InvalidDataType,
    /// A required parameter was missing.
    MissingRequiredParameter,
    /// The requested write would not fit in available space.
    NoSpaceForObject,
    /// A `DeviceCommunicationControl`/`ReinitializeDevice` password mismatched.
    PasswordFailure,
    /// A write to a full, `stop-when-full` Trend Log was rejected.
    LogBufferFull,
    /// The requested property does not exist on this object.
    UnknownProperty,
    /// The requested object instance does not exist.
    UnknownObject,
}

impl ErrorCode {
    /// Maps to the ASHRAE 135 wire value.
    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::Other(v) => v,
            Self::ConfigurationInProgress => 2,
            Self::DeviceBusy => 3,
            Self::FileAccessDenied => 5,
            Self::InconsistentParameters => 7,
            Self::InvalidDataType => 9,
            Self::InvalidArrayIndex => 15,
            Self::MissingRequiredParameter => 16,
            Self::NoSpaceForObject => 17,
            Self::PasswordFailure => 26,
            Self::UnknownObject => 31,
            Self::UnknownProperty => 32,
            Self::LogBufferFull => 43,
        }
    }

    /// Maps a wire value back to a code, preserving unknown values in `Other`.
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        match value {
            2 => Self::ConfigurationInProgress,
            3 => Self::DeviceBusy,
            5 => Self::FileAccessDenied,
            7 => Self::InconsistentParameters,
            9 => Self::InvalidDataType,
            15 => Self::InvalidArrayIndex,
            16 => Self::MissingRequiredParameter,
            17 => Self::NoSpaceForObject,
            26 => Self::PasswordFailure,
            31 => Self::UnknownObject,
            32 => Self::UnknownProperty,
            43 => Self::LogBufferFull,
            other => Self::Other(other),
        }
    }
}

/// The three ways a service codec call can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The bytes themselves were malformed; the frame is dropped silently.
    Decode(ProtocolError),
    /// The peer is being asked to reject the request outright.
    Reject(RejectReason),
    /// The peer understood but cannot comply.
    Abort(AbortReason),
    /// A semantic failure, reported as `(class, code)`.
    Application(ErrorClass, ErrorCode),
}

impl From<ProtocolError> for ServiceError {
    fn from(value: ProtocolError) -> Self {
        Self::Decode(value)
    }
}

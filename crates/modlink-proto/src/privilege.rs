//! Framework privilege levels and their wire decoding.
//!
//! The service reports its execution privilege as a raw `i32` so that
//! old clients keep working against newer services. Decoding is total:
//! any code outside the known set degrades to [`Privilege::Unknown`]
//! instead of failing the call.

use serde::{Deserialize, Serialize};

/// Wire code for a framework running as root.
pub const WIRE_PRIVILEGE_ROOT: i32 = 0;
/// Wire code for a framework running in a container with a substitute
/// system service process.
pub const WIRE_PRIVILEGE_CONTAINER: i32 = 1;
/// Wire code for a framework running as a separate application with at
/// most shell-level permission.
pub const WIRE_PRIVILEGE_APP: i32 = 2;
/// Wire code for a framework embedded directly in the host
/// application.
pub const WIRE_PRIVILEGE_EMBEDDED: i32 = 3;

/// Execution privilege of the remote framework implementation.
///
/// Obtained with [`Privilege::from_wire`]; callers never construct the
/// level from anything but the service's reply. The level is advisory
/// for most callers, with one hard consequence: an [embedded]
/// framework has no service process of its own, so remote preference
/// and file storage do not exist and the corresponding operations
/// report absence.
///
/// [embedded]: Privilege::Embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// The service reported a code this client does not know about.
    Unknown,
    /// The framework runs with root privilege.
    Root,
    /// The framework runs in a container with a substitute system
    /// service process.
    Container,
    /// The framework runs as a separate application, holding at most
    /// shell-level permission.
    App,
    /// The framework is embedded in the host application; remote
    /// storage operations are structurally unavailable.
    Embedded,
}

impl Privilege {
    /// Decode a wire privilege code.
    ///
    /// Total over all of `i32`: the four known codes map to their
    /// levels and everything else, including negative values, becomes
    /// [`Privilege::Unknown`]. A newer service reporting a code this
    /// client predates must never fail the metadata call.
    #[must_use]
    pub const fn from_wire(code: i32) -> Self {
        match code {
            WIRE_PRIVILEGE_ROOT => Self::Root,
            WIRE_PRIVILEGE_CONTAINER => Self::Container,
            WIRE_PRIVILEGE_APP => Self::App,
            WIRE_PRIVILEGE_EMBEDDED => Self::Embedded,
            _ => Self::Unknown,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_known_codes_decode_exactly() {
        assert_eq!(Privilege::from_wire(0), Privilege::Root);
        assert_eq!(Privilege::from_wire(1), Privilege::Container);
        assert_eq!(Privilege::from_wire(2), Privilege::App);
        assert_eq!(Privilege::from_wire(3), Privilege::Embedded);
    }

    #[test]
    fn test_out_of_range_codes_degrade_to_unknown() {
        assert_eq!(Privilege::from_wire(4), Privilege::Unknown);
        assert_eq!(Privilege::from_wire(-1), Privilege::Unknown);
        assert_eq!(Privilege::from_wire(i32::MAX), Privilege::Unknown);
        assert_eq!(Privilege::from_wire(i32::MIN), Privilege::Unknown);
    }

    #[test]
    fn test_serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Privilege::Embedded).unwrap();
        assert_eq!(json, "\"embedded\"");
        let back: Privilege = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Privilege::Embedded);
    }

    proptest! {
        /// Decoding never panics and unknown codes never alias a known
        /// level.
        #[test]
        fn prop_decode_total_over_i32(code in any::<i32>()) {
            let level = Privilege::from_wire(code);
            if (0..=3).contains(&code) {
                prop_assert_ne!(level, Privilege::Unknown);
            } else {
                prop_assert_eq!(level, Privilege::Unknown);
            }
        }
    }
}

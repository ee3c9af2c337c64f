//! Library version and compatibility check

/// Full version string of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const VERSION_MAJOR: u32 = parse_component(env!("CARGO_PKG_VERSION_MAJOR"));
pub const VERSION_MINOR: u32 = parse_component(env!("CARGO_PKG_VERSION_MINOR"));
pub const VERSION_MICRO: u32 = parse_component(env!("CARGO_PKG_VERSION_PATCH"));

const fn parse_component(text: &str) -> u32 {
    let bytes = text.as_bytes();
    let mut value = 0u32;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    value
}

/// Whether code built against `major.minor` can use this library
///
/// The major version has to match exactly; the library's minor version may
/// be newer than the one the caller was built against.
pub fn is_compatible(major: u32, minor: u32) -> bool {
    if major != VERSION_MAJOR || minor > VERSION_MINOR {
        tracing::error!(
            expected = %format!("{major}.{minor}"),
            found = VERSION,
            "Incompatible prefs-core version"
        );
        return false;
    }
    true
}

/// Startup version check
///
/// Expands to a `bool`; callers abort startup when it is `false`. Both sides
/// of the comparison come from the same `prefs-core` build, so with static
/// linking it always holds. It is a placeholder hook for builds where the
/// library and its callers can be compiled separately; use
/// [`is_compatible`] with recorded constants to compare against another build.
#[macro_export]
macro_rules! check_version {
    () => {
        $crate::version::is_compatible($crate::version::VERSION_MAJOR, $crate::version::VERSION_MINOR)
    };
}

// Diagnostic output:
//   feature=defmt and os=none? defmt::debug!
//   feature=std? stdout
//   neither? nothing

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
pub use std::println;

#[cfg(all(target_os = "none", feature = "defmt"))]
pub use defmt::debug as println;

#[cfg(all(
    not(feature = "std"),
    not(all(target_os = "none", feature = "defmt"))
))]
#[macro_export]
macro_rules! println {
    ($fmt:expr) => {};
    ($fmt:expr, $($arg:tt)*) => {};
}

#[cfg(all(
    not(feature = "std"),
    not(all(target_os = "none", feature = "defmt"))
))]
pub use println;

/// Print only in verbose sessions, prefixed with the device name
///
/// Verbose output is hex tables and strings, so it is a `std`-only
/// feature; elsewhere the arguments are not evaluated.
#[cfg(feature = "std")]
macro_rules! verbose {
    ($config:expr, $($arg:tt)*) => {
        if $config.verbose {
            $crate::debug::println!(
                "{}: {}",
                $config.name,
                format_args!($($arg)*)
            );
        }
    };
}

#[cfg(not(feature = "std"))]
macro_rules! verbose {
    ($config:expr, $($arg:tt)*) => {};
}

pub(crate) use verbose;

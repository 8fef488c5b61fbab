//! Errno values reported through the NSS `errnop` out-parameter.
//!
//! Only the codes this backend can produce are listed. Values match Linux.

pub const ENOENT: i32 = 2;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EINVAL: i32 = 22;
pub const ERANGE: i32 = 34;

/// Returns the message for one of the errno values above.
pub fn strerror_message(errnum: i32) -> &'static str {
    match errnum {
        0 => "Success",
        ENOENT => "No such file or directory",
        EAGAIN => "Resource temporarily unavailable",
        ENOMEM => "Cannot allocate memory",
        EINVAL => "Invalid argument",
        ERANGE => "Numerical result out of range",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strerror_known_and_unknown() {
        assert_eq!(strerror_message(ERANGE), "Numerical result out of range");
        assert_eq!(strerror_message(0), "Success");
        assert_eq!(strerror_message(9999), "Unknown error");
    }
}

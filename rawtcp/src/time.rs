/*! Time as seen by a transport.

Every transport provides its own clock, so that simulated transports can run a connection
deterministically and without waiting.

 - [Instant] is a point on that clock, in milliseconds.
 - [Duration] is the standard relative time, used for timeouts.
 - [Expiration] is a deadline that may never come.

[Instant]: struct.Instant.html
[Duration]: struct.Duration.html
[Expiration]: enum.Expiration.html
*/
use core::{fmt, ops};
pub use core::time::Duration;

/// A point in time, in milliseconds since an arbitrary start of the clock.
///
/// Only differences between instants of the same clock are meaningful.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    /// The total number of milliseconds.
    pub millis: i64,
}

/// A deadline for a blocking operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Expires at the given instant.
    When(Instant),
    /// Never expires.
    Never,
}

impl Instant {
    /// Create a new `Instant` from a number of milliseconds.
    pub fn from_millis<T: Into<i64>>(millis: T) -> Instant {
        Instant { millis: millis.into() }
    }

    /// Create a new `Instant` from a number of seconds.
    pub fn from_secs<T: Into<i64>>(secs: T) -> Instant {
        Instant { millis: secs.into() * 1000 }
    }

    /// The wall clock time.
    ///
    /// Only used where a transport has no better clock.
    #[cfg(feature = "std")]
    pub fn now() -> Instant {
        Self::from(::std::time::SystemTime::now())
    }

    /// The total number of milliseconds.
    pub fn total_millis(&self) -> i64 {
        self.millis
    }
}

#[cfg(feature = "std")]
impl From<::std::time::SystemTime> for Instant {
    fn from(other: ::std::time::SystemTime) -> Instant {
        // A clock before the epoch is treated as the epoch itself.
        let n = other.duration_since(::std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_millis(n.as_millis() as i64)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:03}s", self.millis.div_euclid(1000), self.millis.rem_euclid(1000))
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant::from_millis(self.millis + rhs.as_millis() as i64)
    }
}

impl ops::AddAssign<Duration> for Instant {
    fn add_assign(&mut self, rhs: Duration) {
        self.millis += rhs.as_millis() as i64;
    }
}

impl ops::Sub<Instant> for Instant {
    type Output = Duration;

    /// The distance between two instants, regardless of their order.
    fn sub(self, rhs: Instant) -> Duration {
        Duration::from_millis((self.millis - rhs.millis).abs() as u64)
    }
}

impl Expiration {
    /// Query whether the deadline has been reached at `now`.
    pub fn is_reached(&self, now: Instant) -> bool {
        match self {
            Expiration::When(instant) => *instant <= now,
            Expiration::Never => false,
        }
    }
}

impl Default for Expiration {
    fn default() -> Self {
        Expiration::Never
    }
}

impl From<Option<Instant>> for Expiration {
    fn from(opt: Option<Instant>) -> Self {
        opt.map_or(Expiration::Never, Expiration::When)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instant_ops() {
        assert_eq!(Instant::from_millis(4) + Duration::from_millis(6), Instant::from_millis(10));
        assert_eq!(Instant::from_millis(7) - Instant::from_millis(5), Duration::from_millis(2));
        assert_eq!(Instant::from_millis(5) - Instant::from_millis(7), Duration::from_millis(2));
        let mut instant = Instant::from_secs(1);
        instant += Duration::from_millis(250);
        assert_eq!(instant.total_millis(), 1250);
    }

    #[test]
    fn instant_display() {
        assert_eq!(format!("{}", Instant::from_millis(5674)), "5.674s");
        assert_eq!(format!("{}", Instant::from_millis(5005)), "5.005s");
    }

    #[test]
    fn deadlines() {
        let deadline = Expiration::from(Some(Instant::from_millis(100)));
        assert!(!deadline.is_reached(Instant::from_millis(99)));
        assert!(deadline.is_reached(Instant::from_millis(100)));
        assert!(!Expiration::Never.is_reached(Instant::from_millis(i64::max_value())));
        assert_eq!(Expiration::from(None), Expiration::default());
    }

    #[test]
    #[cfg(feature = "std")]
    fn from_system_time() {
        assert_eq!(Instant::from(::std::time::UNIX_EPOCH), Instant::from_millis(0));
        let later = ::std::time::UNIX_EPOCH + ::std::time::Duration::from_millis(2085955200_123);
        assert_eq!(Instant::from(later), Instant::from_millis(2085955200_123i64));
    }
}

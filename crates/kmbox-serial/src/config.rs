use std::fmt;
use std::time::Duration;

/// Baud rate used when the caller does not pick one.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Line configuration applied to an open port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl LineConfig {
    /// 8 data bits, 1 stop bit, no parity at `baud_rate`.
    pub fn eight_n_one(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self::eight_n_one(DEFAULT_BAUD_RATE)
    }
}

impl fmt::Display for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        write!(
            f,
            "{} {}-{}-{}",
            self.baud_rate,
            self.data_bits.count(),
            parity,
            stop
        )
    }
}

/// Read/write timeout policy for an open port.
///
/// Totals follow the constant-plus-per-byte model: an operation on `n` bytes
/// may block for at most `constant + n * per_byte`. The read interval bounds
/// the gap between two received bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub read_interval: Duration,
    pub read_total_constant: Duration,
    pub read_total_per_byte: Duration,
    pub write_total_constant: Duration,
    pub write_total_per_byte: Duration,
}

impl TimeoutPolicy {
    /// Upper bound on a read of `len` bytes.
    pub fn read_deadline(&self, len: usize) -> Duration {
        total(self.read_total_constant, self.read_total_per_byte, len)
    }

    /// Upper bound on a write of `len` bytes.
    pub fn write_deadline(&self, len: usize) -> Duration {
        total(self.write_total_constant, self.write_total_per_byte, len)
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            read_interval: Duration::from_millis(50),
            read_total_constant: Duration::from_millis(50),
            read_total_per_byte: Duration::from_millis(10),
            write_total_constant: Duration::from_millis(50),
            write_total_per_byte: Duration::from_millis(10),
        }
    }
}

fn total(constant: Duration, per_byte: Duration, len: usize) -> Duration {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    constant.saturating_add(per_byte.saturating_mul(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_line_config_is_115200_8n1() {
        let cfg = LineConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.stop_bits, StopBits::One);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.to_string(), "115200 8-N-1");
    }

    #[test]
    fn default_timeouts_match_device_profile() {
        let policy = TimeoutPolicy::default();
        assert_eq!(policy.read_interval, Duration::from_millis(50));
        assert_eq!(policy.read_deadline(0), Duration::from_millis(50));
        assert_eq!(policy.write_deadline(16), Duration::from_millis(210));
    }

    #[test]
    fn deadline_saturates_on_huge_lengths() {
        let policy = TimeoutPolicy::default();
        assert!(policy.write_deadline(usize::MAX) > Duration::from_secs(1_000_000));
    }
}

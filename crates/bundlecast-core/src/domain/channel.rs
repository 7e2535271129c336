//! Channel opt-in bits.

use bundlecast_state::UpdateType;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

const STABLE_BIT: u32 = 1;
const ALPHA_BIT: u32 = 1 << 1;
const BETA_BIT: u32 = 1 << 2;

/// Decoded channel bitmask: bit0 = stable, bit1 = alpha, bit2 = beta.
///
/// Higher bits are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBits {
    pub stable: bool,
    pub alpha: bool,
    pub beta: bool,
}

impl ChannelBits {
    pub const NONE: ChannelBits = ChannelBits {
        stable: false,
        alpha: false,
        beta: false,
    };

    pub fn from_mask(mask: u32) -> Self {
        ChannelBits {
            stable: mask & STABLE_BIT != 0,
            alpha: mask & ALPHA_BIT != 0,
            beta: mask & BETA_BIT != 0,
        }
    }

    /// Parse the `update_bits` query value: a decimal integer in `u32`
    /// range, surrounding whitespace allowed.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        value
            .trim()
            .parse::<u32>()
            .map(Self::from_mask)
            .map_err(|_| ValidationError::InvalidUpdateBits {
                value: value.to_string(),
            })
    }

    pub fn mask(&self) -> u32 {
        let mut mask = 0;
        if self.stable {
            mask |= STABLE_BIT;
        }
        if self.alpha {
            mask |= ALPHA_BIT;
        }
        if self.beta {
            mask |= BETA_BIT;
        }
        mask
    }

    /// Whether a record on `channel` may be offered to this client.
    ///
    /// Beta subscribers see alpha and stable; alpha subscribers see stable;
    /// nothing is offered when no bit is set.
    pub fn admits(&self, channel: UpdateType) -> bool {
        match channel {
            UpdateType::Stable => self.stable || self.alpha || self.beta,
            UpdateType::Alpha => self.alpha || self.beta,
            UpdateType::Beta => self.beta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_each_bit() {
        assert_eq!(
            ChannelBits::from_mask(1),
            ChannelBits {
                stable: true,
                alpha: false,
                beta: false,
            }
        );
        assert_eq!(
            ChannelBits::from_mask(2),
            ChannelBits {
                stable: false,
                alpha: true,
                beta: false,
            }
        );
        assert_eq!(
            ChannelBits::from_mask(4),
            ChannelBits {
                stable: false,
                alpha: false,
                beta: true,
            }
        );
        assert_eq!(ChannelBits::from_mask(0), ChannelBits::NONE);
    }

    #[test]
    fn ignores_high_bits() {
        assert_eq!(ChannelBits::from_mask(8), ChannelBits::NONE);
        assert_eq!(ChannelBits::from_mask(13).mask(), 5);
    }

    #[test]
    fn parse_accepts_decimal_integers() {
        assert_eq!(ChannelBits::parse("7").unwrap().mask(), 7);
        assert_eq!(ChannelBits::parse(" 4 ").unwrap().mask(), 4);
        assert_eq!(ChannelBits::parse("0").unwrap(), ChannelBits::NONE);
    }

    #[test]
    fn parse_rejects_non_numeric_and_out_of_range() {
        for bad in ["", "abc", "-1", "1.5", "Infinity", "NaN", "99999999999"] {
            assert!(
                matches!(
                    ChannelBits::parse(bad),
                    Err(ValidationError::InvalidUpdateBits { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn channel_hierarchy() {
        let none = ChannelBits::NONE;
        for t in [UpdateType::Stable, UpdateType::Alpha, UpdateType::Beta] {
            assert!(!none.admits(t));
        }

        let stable = ChannelBits::from_mask(1);
        assert!(stable.admits(UpdateType::Stable));
        assert!(!stable.admits(UpdateType::Alpha));
        assert!(!stable.admits(UpdateType::Beta));

        let alpha = ChannelBits::from_mask(2);
        assert!(alpha.admits(UpdateType::Stable));
        assert!(alpha.admits(UpdateType::Alpha));
        assert!(!alpha.admits(UpdateType::Beta));

        let beta = ChannelBits::from_mask(4);
        assert!(beta.admits(UpdateType::Stable));
        assert!(beta.admits(UpdateType::Alpha));
        assert!(beta.admits(UpdateType::Beta));
    }
}

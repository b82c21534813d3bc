use epe_common::MinorUnits;
use serde::{Deserialize, Serialize};

/// The platform's configured fee rate, in basis points (1/100th of a percent). Stored as an
/// integer so that the fee split is exact; a 4.5% commission is `FeeSchedule::new(450)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    rate_basis_points: i64,
}

/// An exact split of a gross amount into the platform's fee and the provider's net.
/// `platform_fee + provider_net == gross` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub gross: MinorUnits,
    pub platform_fee: MinorUnits,
    pub provider_net: MinorUnits,
}

impl FeeSchedule {
    pub fn new(rate_basis_points: i64) -> Self {
        Self { rate_basis_points }
    }

    pub fn rate_basis_points(&self) -> i64 {
        self.rate_basis_points
    }

    /// Splits `gross` into fee and net. The fee is rounded half-up to the nearest minor unit;
    /// the net absorbs the rounding so the two always sum back to the gross amount.
    pub fn split(&self, gross: MinorUnits) -> FeeBreakdown {
        let fee = (gross.value() * self.rate_basis_points + 5_000) / 10_000;
        let platform_fee = MinorUnits::from(fee);
        FeeBreakdown { gross, platform_fee, provider_net: gross - platform_fee }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_exactly_at_four_and_a_half_percent() {
        let fees = FeeSchedule::new(450);
        let split = fees.split(MinorUnits::from(8000));
        assert_eq!(split.platform_fee, MinorUnits::from(360));
        assert_eq!(split.provider_net, MinorUnits::from(7640));
    }

    #[test]
    fn rounds_half_up() {
        let fees = FeeSchedule::new(450);
        // 4.5% of 1234 is 55.53 minor units
        let split = fees.split(MinorUnits::from(1234));
        assert_eq!(split.platform_fee, MinorUnits::from(56));
        assert_eq!(split.provider_net, MinorUnits::from(1178));
        // 4.5% of 100 is exactly 4.5 minor units
        let split = fees.split(MinorUnits::from(100));
        assert_eq!(split.platform_fee, MinorUnits::from(5));
        assert_eq!(split.provider_net, MinorUnits::from(95));
    }

    #[test]
    fn no_rounding_leakage() {
        let fees = FeeSchedule::new(450);
        for gross in [1, 7, 99, 101, 4999, 8000, 123_457] {
            let split = fees.split(MinorUnits::from(gross));
            assert_eq!(split.platform_fee + split.provider_net, split.gross);
        }
    }

    #[test]
    fn zero_rate_takes_no_fee() {
        let split = FeeSchedule::new(0).split(MinorUnits::from(5000));
        assert_eq!(split.platform_fee, MinorUnits::from(0));
        assert_eq!(split.provider_net, MinorUnits::from(5000));
    }
}

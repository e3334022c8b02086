//! Signal Registry
//!
//! Named momentum variants with their display titles and configurations.

use crate::{RegressionConfig, SignalConfig, SignalSource, VolBasis, VolScale};
use hobart_data::FactorColumn;

/// Signal families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalFamily {
    /// Accumulated total return
    Momentum,
    /// Accumulated vendor idiosyncratic return
    VendorIdiosyncratic,
    /// Accumulated residual of a rolling factor regression
    FactorIdiosyncratic,
}

/// Signal metadata
#[derive(Debug, Clone)]
pub struct SignalInfo {
    /// Signal name (unique identifier)
    pub name: &'static str,
    /// Chart title prefix
    pub title: &'static str,
    /// Signal family
    pub family: SignalFamily,
    /// Brief description of the signal
    pub description: &'static str,
}

/// Get all available signal info
pub fn available_signals() -> Vec<SignalInfo> {
    vec![
        SignalInfo {
            name: "momentum",
            title: "Momentum",
            family: SignalFamily::Momentum,
            description: "Sum of log returns over 230 days, lagged 21 days",
        },
        SignalInfo {
            name: "vol_scaled_momentum",
            title: "Vol. Scaled Momentum",
            family: SignalFamily::Momentum,
            description: "Momentum divided by the 230-day return volatility",
        },
        SignalInfo {
            name: "barra_momentum",
            title: "Barra Idio. Momentum",
            family: SignalFamily::VendorIdiosyncratic,
            description: "Sum of log specific returns over 230 days, lagged 21 days",
        },
        SignalInfo {
            name: "capm_momentum",
            title: "CAPM Momentum",
            family: SignalFamily::FactorIdiosyncratic,
            description: "Residual momentum against the market factor, 232-day sum",
        },
        SignalInfo {
            name: "ff3_momentum",
            title: "Fama French 3 Idio. Momentum",
            family: SignalFamily::FactorIdiosyncratic,
            description: "Residual momentum against the Fama-French three-factor model",
        },
        SignalInfo {
            name: "vol_scaled_ff5_momentum",
            title: "Vol. Scaled Fama French 5 Idio. Momentum",
            family: SignalFamily::FactorIdiosyncratic,
            description: "Five-factor residual momentum divided by residual volatility",
        },
    ]
}

/// Look up signal metadata by name.
pub fn signal_info(name: &str) -> Option<SignalInfo> {
    available_signals().into_iter().find(|s| s.name == name)
}

/// Configuration of a named signal.
pub fn preset(name: &str) -> Option<SignalConfig> {
    let config = match name {
        "momentum" => SignalConfig::new(SignalSource::Return),
        "vol_scaled_momentum" => {
            SignalConfig::new(SignalSource::Return).with_vol_scale(VolScale::default())
        }
        "barra_momentum" => SignalConfig::new(SignalSource::SpecificReturn),
        "capm_momentum" => SignalConfig::new(residual(&[FactorColumn::MktRf])).with_window(232),
        "ff3_momentum" => SignalConfig::new(residual(&[
            FactorColumn::MktRf,
            FactorColumn::Smb,
            FactorColumn::Hml,
        ])),
        "vol_scaled_ff5_momentum" => SignalConfig::new(residual(&FactorColumn::all()))
            .with_vol_scale(VolScale {
                window: None,
                basis: VolBasis::Raw,
            }),
        _ => return None,
    };
    Some(config)
}

fn residual(factors: &[FactorColumn]) -> SignalSource {
    SignalSource::FactorResidual(RegressionConfig::new(factors.to_vec(), 252))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_available_signals() {
        let signals = available_signals();
        assert_eq!(signals.len(), 6);

        let names: HashSet<_> = signals.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), signals.len(), "signal names should be unique");
    }

    #[test]
    fn test_every_signal_has_a_valid_preset() {
        for info in available_signals() {
            let config = preset(info.name).unwrap();
            assert!(config.validate().is_ok(), "{} is invalid", info.name);
            let regresses = !config.source.factors().is_empty();
            assert_eq!(
                regresses,
                info.family == SignalFamily::FactorIdiosyncratic,
                "{}",
                info.name
            );
        }
        assert!(preset("unknown").is_none());
    }

    #[test]
    fn test_observed_windows() {
        let capm = preset("capm_momentum").unwrap();
        assert_eq!(capm.window, 232);
        assert_eq!(capm.source.factors(), &[FactorColumn::MktRf]);

        let ff5 = preset("vol_scaled_ff5_momentum").unwrap();
        assert_eq!(ff5.source.factors().len(), 5);
        assert_eq!(ff5.vol_window(), Some(230));
        assert_eq!(ff5.lag, 21);
    }

    #[test]
    fn test_signal_info_lookup() {
        let info = signal_info("ff3_momentum").unwrap();
        assert_eq!(info.title, "Fama French 3 Idio. Momentum");
        assert!(signal_info("ff4_momentum").is_none());
    }
}

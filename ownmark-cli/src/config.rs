//! Command-line overrides layered over environment configuration.

use std::time::Duration;

use ownmark_core::{ExplorerConfig, ExtractionParams, ServiceConfig, TrackerConfig};

/// Options shared by every command.
pub struct GlobalOpts {
    pub quiet: bool,
    pub api_base: Option<String>,
}

impl GlobalOpts {
    /// Service configuration from the environment, with `--api-base` applied.
    pub fn service_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        if let Some(base) = &self.api_base {
            config.api_base = base.clone();
        }
        config
    }

    pub fn explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig::default()
    }

    pub fn tracker_config(&self, interval_secs: Option<u64>) -> TrackerConfig {
        match interval_secs {
            Some(secs) => TrackerConfig {
                poll_interval: Duration::from_secs(secs),
            },
            None => TrackerConfig::default(),
        }
    }
}

/// Per-parameter overrides of a preset.
#[derive(Debug, Default, Clone)]
pub struct ParamOverrides {
    pub repetition: Option<u32>,
    pub ecc_parity: Option<u32>,
    pub qim_step: Option<f64>,
    pub frame_step: Option<u32>,
    pub no_y_channel: bool,
}

impl ParamOverrides {
    /// No flag was given; the preset applies as-is.
    pub fn is_empty(&self) -> bool {
        self.repetition.is_none()
            && self.ecc_parity.is_none()
            && self.qim_step.is_none()
            && self.frame_step.is_none()
            && !self.no_y_channel
    }

    pub fn apply(&self, mut params: ExtractionParams) -> ExtractionParams {
        if let Some(repetition) = self.repetition {
            params.repetition = repetition;
        }
        if let Some(parity) = self.ecc_parity {
            params.ecc_parity_bytes = parity;
        }
        if let Some(step) = self.qim_step {
            params.qim_step = step;
        }
        if let Some(step) = self.frame_step {
            params.frame_step = Some(step);
        }
        if self.no_y_channel {
            params.use_y_channel = false;
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ownmark_core::{MediaKind, Preset};

    #[test]
    fn test_overrides_only_touch_given_fields() {
        let base = Preset::Original.params(MediaKind::Image);
        let overrides = ParamOverrides {
            repetition: Some(200),
            no_y_channel: true,
            ..Default::default()
        };
        let params = overrides.apply(base.clone());

        assert_eq!(params.repetition, 200);
        assert!(!params.use_y_channel);
        assert_eq!(params.qim_step, base.qim_step);
        assert_eq!(params.ecc_parity_bytes, base.ecc_parity_bytes);
    }

    #[test]
    fn test_overrides_is_empty() {
        assert!(ParamOverrides::default().is_empty());
        let overrides = ParamOverrides {
            qim_step: Some(20.0),
            ..Default::default()
        };
        assert!(!overrides.is_empty());
    }

    #[test]
    fn test_api_base_flag_wins() {
        let ctx = GlobalOpts {
            quiet: false,
            api_base: Some("http://example.test/api".into()),
        };
        assert_eq!(ctx.service_config().api_base, "http://example.test/api");
    }

    #[test]
    fn test_interval_flag() {
        let ctx = GlobalOpts {
            quiet: false,
            api_base: None,
        };
        assert_eq!(
            ctx.tracker_config(Some(3)).poll_interval,
            Duration::from_secs(3)
        );
    }
}

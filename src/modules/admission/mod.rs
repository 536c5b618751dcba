mod gate;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use teloxide::dptree::di::DependencySupplier;
use teloxide::prelude::*;

use crate::{config::SharedConfig, module_mgr::Module};
pub(crate) use gate::{Admission, AdmissionGate, CooldownState};

/// Renders the notice sent to a user who has to wait for `remaining`.
///
/// The wait is rounded up to whole seconds, so users are never told to
/// wait "0 seconds".
pub(crate) fn cooldown_notice(config: &SharedConfig, remaining: Duration) -> String {
    let mut seconds = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        seconds += 1;
    }
    config
        .i18n
        .cooldown_prompt
        .replace("{seconds}", &seconds.max(1).to_string())
}

/// Provides the [`AdmissionGate`] shared by all chat handlers.
pub(crate) struct Cooldown;

#[async_trait]
impl Module for Cooldown {
    async fn register_dependency(&mut self, dep_map: &mut DependencyMap) -> Result<(), Error> {
        let config: Arc<SharedConfig> = dep_map.get();

        let gate = match config.cooldown_retention {
            Some(periods) => AdmissionGate::with_retention(config.cooldown(), periods),
            None => AdmissionGate::new(config.cooldown()),
        };
        info!(
            "Admission gate is ready, cooldown: {}s",
            gate.cooldown().as_secs()
        );
        dep_map.insert(gate);

        Ok(())
    }
}

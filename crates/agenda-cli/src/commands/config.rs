use agenda_core::config::normalize_base_url;
use agenda_core::TombstonePolicy;

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

/// Values passed to `config init`; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ConfigInit {
    pub api_base_url: Option<String>,
    pub tombstone_policy: Option<String>,
    pub sync_interval_secs: Option<u64>,
    pub activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            tombstone_policy,
            sync_interval,
            no_activate,
        } => {
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = apply_config_init(
                &mut config,
                profile.as_deref().or(global_profile),
                ConfigInit {
                    api_base_url,
                    tombstone_policy,
                    sync_interval_secs: sync_interval,
                    activate: !no_activate,
                },
            )?;

            let path = config.save().map_err(CliError::Config)?;
            println!(
                "Profile '{}' initialized at {}",
                profile_name,
                path.display()
            );
            if config
                .profile(&profile_name)
                .and_then(|profile| profile.api_base_url())
                .is_none()
            {
                println!("Profile '{profile_name}' has no API base URL; sync stays disabled.");
            } else {
                println!("Run `agenda auth login --token <token>` to start syncing.");
            }
            Ok(())
        }
    }
}

/// Merge `init` into `config` and return the profile name it touched.
pub fn apply_config_init(
    config: &mut CliProfilesConfig,
    profile_name: Option<&str>,
    init: ConfigInit,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(profile_name);

    let api_base_url = normalize_text_option(init.api_base_url)
        .map(normalize_base_url)
        .transpose()
        .map_err(|error| CliError::Config(error.to_string()))?;
    let tombstone_policy = normalize_text_option(init.tombstone_policy)
        .map(|raw| raw.parse::<TombstonePolicy>())
        .transpose()
        .map_err(CliError::Config)?;

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(url) = api_base_url {
        profile.api_base_url = Some(url);
    }
    if let Some(policy) = tombstone_policy {
        profile.tombstone_policy = Some(policy);
    }
    if let Some(secs) = init.sync_interval_secs {
        profile.sync_interval_secs = Some(secs);
    }
    profile
        .engine_config()
        .validate()
        .map_err(|error| CliError::Config(error.to_string()))?;

    if init.activate {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}
